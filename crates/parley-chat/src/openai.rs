//! OpenAI-compatible chat-completions text generator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parley_core::config::LlmConfig;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::ChatError;
use crate::generator::{Operation, TemplateArgs, TextGenerator};
use crate::templates::PromptTemplates;

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

/// Renders the operation's template and sends it as a single user message.
pub struct OpenAiTextGenerator {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    templates: Arc<PromptTemplates>,
}

impl OpenAiTextGenerator {
    /// Build from config, reading the API key from `config.api_key_env`.
    ///
    /// A missing key is allowed for local OpenAI-compatible servers; requests
    /// are then sent without an `Authorization` header.
    pub fn from_config(
        config: &LlmConfig,
        templates: Arc<PromptTemplates>,
    ) -> Result<Self, ChatError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            warn!(env = %config.api_key_env, "No LLM API key set; sending unauthenticated requests");
        }
        Self::new(config, api_key, templates)
    }

    pub fn new(
        config: &LlmConfig,
        api_key: Option<String>,
        templates: Arc<PromptTemplates>,
    ) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChatError::Generation(format!("client setup failed: {}", e)))?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            templates,
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiTextGenerator {
    async fn generate(
        &self,
        operation: Operation,
        args: &TemplateArgs,
    ) -> Result<String, ChatError> {
        let prompt = self.templates.render(operation, args);
        let url = format!("{}/chat/completions", self.api_base);
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChatError::Generation(format!("{} request failed: {}", operation, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ChatError::Generation(format!(
                "{} returned {}: {}",
                operation, status, text
            )));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Generation(format!("bad {} response: {}", operation, e)))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ChatError::Generation(format!("{} returned no choices", operation)))?;

        debug!(%operation, prompt_len = prompt.len(), output_len = text.len(), "Generation complete");
        Ok(text.trim().to_string())
    }
}
