//! Long-term memory contracts and the HTTP memory service client.
//!
//! The service exposes `POST /search` (JSON) and `POST /upload`
//! (multipart). Any non-success status is reported as
//! [`ChatError::MemoryUnavailable`], so "no results" and "service down"
//! stay distinguishable.

use std::time::Duration;

use async_trait::async_trait;
use parley_core::config::MemoryConfig;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ChatError;

/// One search hit: a group of text partitions from the same document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryResult {
    pub partitions: Vec<String>,
}

/// Searches remembered text.
#[async_trait]
pub trait MemoryRetriever: Send + Sync {
    /// Up to `limit` result groups for `query`.
    ///
    /// Returns an empty vec when nothing matches and an error only when the
    /// service could not answer.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<MemoryResult>, ChatError>;
}

/// Outcome of a document upload, as reported by the memory service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub status: u16,
    pub response_data: String,
}

/// Adds documents to the memory index.
#[async_trait]
pub trait DocumentIngestor: Send + Sync {
    async fn upload(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<UploadReceipt, ChatError>;
}

/// Render search results as the memory bundle handed to the respond prompt.
///
/// One line per result: `memory:` followed by its partitions concatenated.
pub fn render_memories(results: &[MemoryResult]) -> String {
    let mut out = String::new();
    for result in results {
        out.push_str("memory:");
        for partition in &result.partitions {
            out.push_str(partition);
        }
        out.push('\n');
    }
    out
}

// =============================================================================
// HttpMemoryClient
// =============================================================================

#[derive(Serialize)]
struct SearchRequest<'a> {
    index: &'a str,
    query: &'a str,
    limit: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResultGroup>,
}

#[derive(Deserialize)]
struct SearchResultGroup {
    #[serde(default)]
    partitions: Vec<SearchPartition>,
}

#[derive(Deserialize)]
struct SearchPartition {
    #[serde(default)]
    text: String,
}

/// Client for a Kernel-Memory style service.
#[derive(Debug, Clone)]
pub struct HttpMemoryClient {
    client: reqwest::Client,
    base_url: String,
    index: String,
}

impl HttpMemoryClient {
    pub fn new(config: &MemoryConfig) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChatError::MemoryUnavailable(format!("client setup failed: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            index: config.index.clone(),
        })
    }

    pub fn index(&self) -> &str {
        &self.index
    }
}

#[async_trait]
impl MemoryRetriever for HttpMemoryClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<MemoryResult>, ChatError> {
        let url = format!("{}/search", self.base_url);
        let body = SearchRequest {
            index: &self.index,
            query,
            limit,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::MemoryUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ChatError::MemoryUnavailable(format!(
                "search returned {}: {}",
                status, text
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| ChatError::MemoryUnavailable(format!("bad search response: {}", e)))?;

        let results: Vec<MemoryResult> = parsed
            .results
            .into_iter()
            .map(|group| MemoryResult {
                partitions: group.partitions.into_iter().map(|p| p.text).collect(),
            })
            .collect();

        tracing::debug!(query_len = query.len(), results = results.len(), "Memory search complete");
        Ok(results)
    }
}

#[async_trait]
impl DocumentIngestor for HttpMemoryClient {
    async fn upload(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<UploadReceipt, ChatError> {
        let url = format!("{}/upload", self.base_url);
        let size = bytes.len();

        let mut part = Part::bytes(bytes).file_name(file_name.to_string());
        if let Some(ct) = content_type {
            part = part
                .mime_str(ct)
                .map_err(|e| ChatError::InvalidInput(format!("bad content type {:?}: {}", ct, e)))?;
        }
        let form = Form::new()
            .text("index", self.index.clone())
            .text("id", Uuid::new_v4().to_string())
            .part("file", part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ChatError::MemoryUnavailable(e.to_string()))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ChatError::MemoryUnavailable(format!(
                "upload returned {}: {}",
                status, text
            )));
        }

        tracing::info!(file_name, size, status = status.as_u16(), "Document uploaded");
        Ok(UploadReceipt {
            status: status.as_u16(),
            response_data: text,
        })
    }
}
