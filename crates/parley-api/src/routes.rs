//! Router setup with all API routes and middleware.
//!
//! Configures the axum Router with CORS, tracing, body limits
//! and all endpoint handlers.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use parley_core::config::{ParleyConfig, ServerConfig};
use parley_core::error::ParleyError;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let server = &state.config.server;
    let cors = cors_layer(server);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/chat/startChat", post(handlers::start_chat))
        .route("/chat/{conversation_id}", post(handlers::chat))
        .route("/chat/{conversation_id}/messages", get(handlers::messages))
        .route(
            "/documents/upload",
            post(handlers::upload_document)
                .layer(DefaultBodyLimit::max(server.max_upload_bytes)),
        )
        .layer(DefaultBodyLimit::max(server.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS for the configured origins, with credentials.
///
/// Origins that are not valid header values are skipped with a warning.
fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(true)
}

/// Listener address from `server.host` and `general.port`.
pub fn bind_address(config: &ParleyConfig) -> String {
    format!("{}:{}", config.server.host.trim(), config.general.port)
}

/// Start the HTTP server on the configured address.
///
/// Serves until the process exits.
pub async fn start_server(config: &ParleyConfig, state: AppState) -> Result<(), ParleyError> {
    let addr = bind_address(config);
    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ParleyError::Api(format!("Failed to bind: {}", e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| ParleyError::Api(format!("Server error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address_defaults_to_localhost() {
        assert_eq!(bind_address(&ParleyConfig::default()), "127.0.0.1:8000");
    }

    #[test]
    fn test_bind_address_uses_configured_host() {
        let mut config = ParleyConfig::default();
        config.server.host = "0.0.0.0".to_string();
        config.general.port = 9000;
        assert_eq!(bind_address(&config), "0.0.0.0:9000");
    }
}
