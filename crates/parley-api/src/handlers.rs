//! Route handler functions for all API endpoints.
//!
//! Handlers stay thin: extract, call the orchestrator or the ingestor,
//! and turn the outcome into JSON.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::Json;
use parley_chat::UploadReceipt;
use parley_core::types::{Ask, ChatMessage};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub messages: Vec<ChatMessage>,
}

// =============================================================================
// Handler functions
// =============================================================================

/// GET / - liveness greeting.
pub async fn root() -> Json<Value> {
    Json(json!({"Hello": "World"}))
}

/// GET /health - server status and uptime.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// POST /chat/startChat - open a conversation and return the greeting.
pub async fn start_chat(State(state): State<AppState>) -> Result<Json<ChatMessage>, ApiError> {
    let greeting = state.orchestrator.start_chat().await?;
    Ok(Json(greeting))
}

/// POST /chat/{conversation_id} - run one turn and return the bot reply.
pub async fn chat(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    payload: Result<Json<Ask>, JsonRejection>,
) -> Result<Json<ChatMessage>, ApiError> {
    let Json(ask) = payload?;
    let reply = state
        .orchestrator
        .handle_turn(&conversation_id, &ask.prompt)
        .await?;
    Ok(Json(reply))
}

/// GET /chat/{conversation_id}/messages - stored messages in append order.
pub async fn messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let messages = state.orchestrator.history(&conversation_id).await?;
    Ok(Json(MessagesResponse { messages }))
}

/// POST /documents/upload - forward the multipart `file` field to the memory service.
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadReceipt>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or("upload")
            .to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;

        tracing::info!(file_name = %file_name, size = bytes.len(), "Uploading document");
        let receipt = state
            .ingestor
            .upload(&file_name, content_type.as_deref(), bytes.to_vec())
            .await?;
        return Ok(Json(receipt));
    }

    Err(ApiError::BadRequest(
        "Multipart field 'file' is required".to_string(),
    ))
}
