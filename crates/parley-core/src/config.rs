use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ParleyError, Result};

/// Top-level configuration for the Parley service.
///
/// Loaded from `~/.parley/config.toml` by default. Every section falls back
/// to its defaults when missing, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParleyConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl ParleyConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ParleyConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject values that would make the service unusable.
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(ParleyError::Config("server.host must not be empty".into()));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ParleyError::Config("llm.model must not be empty".into()));
        }
        if self.llm.timeout_secs == 0 {
            return Err(ParleyError::Config("llm.timeout_secs must be > 0".into()));
        }
        if self.memory.base_url.trim().is_empty() {
            return Err(ParleyError::Config(
                "memory.base_url must not be empty".into(),
            ));
        }
        if self.memory.index.trim().is_empty() {
            return Err(ParleyError::Config("memory.index must not be empty".into()));
        }
        if self.memory.timeout_secs == 0 {
            return Err(ParleyError::Config(
                "memory.timeout_secs must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory holding the SQLite chat log.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// API server port.
    pub port: u16,
    /// Bot message used to open a new conversation.
    pub greeting: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.parley/data".to_string(),
            log_level: "info".to_string(),
            port: 8000,
            greeting: "Hello! How can I help you today?".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface the HTTP listener binds to.
    pub host: String,
    /// Origins allowed by the CORS layer.
    pub allowed_origins: Vec<String>,
    /// Global request body limit in bytes.
    pub max_body_bytes: usize,
    /// Body limit for document uploads in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            allowed_origins: vec![
                "http://localhost".to_string(),
                "http://localhost:8000".to_string(),
                "http://localhost:3000".to_string(),
            ],
            max_body_bytes: 1024 * 1024,
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

/// Language model endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API.
    pub api_base: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Chat completion model.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on generated tokens per call.
    pub max_tokens: u32,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Directory of `<operation>/skprompt.txt` templates. Empty uses built-ins.
    pub prompt_dir: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.0,
            max_tokens: 512,
            timeout_secs: 60,
            prompt_dir: String::new(),
        }
    }
}

/// Long-term memory service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Base URL of the memory service (`/search`, `/upload`).
    pub base_url: String,
    /// Index searched and written to.
    pub index: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9001".to_string(),
            index: "km-py".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Turn pipeline settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Run turns of the same conversation one at a time.
    pub serialize_per_conversation: bool,
}
