//! Parley application binary - composition root.
//!
//! 1. Resolve configuration (CLI > env > TOML > defaults)
//! 2. Open the SQLite chat log
//! 3. Build the prompt templates, model client and memory client
//! 4. Wire the turn orchestrator and start the axum REST API server

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};
use parley_api::routes;
use parley_api::state::AppState;
use parley_chat::{
    HttpMemoryClient, OpenAiTextGenerator, OrchestratorSettings, PromptTemplates,
    SqliteConversationStore, TurnOrchestrator,
};
use parley_core::config::ParleyConfig;
use parley_storage::{Database, MessageRepository};

use crate::cli::CliArgs;

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") || data_dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Install the global subscriber before anything else logs.
///
/// Starts from `RUST_LOG`, or `info` when unset; the returned handle swaps
/// in the configured level once the config is loaded.
fn init_tracing() -> FilterHandle {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter, handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
    handle
}

/// Switch to the configured level unless `RUST_LOG` already chose one.
fn apply_log_level(
    handle: &FilterHandle,
    level: &str,
    env_override: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if env_override {
        return Ok(());
    }
    let filter = EnvFilter::try_new(level)?;
    handle.reload(filter)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let log_handle = init_tracing();

    tracing::info!("Starting Parley v{}", env!("CARGO_PKG_VERSION"));

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = ParleyConfig::load_or_default(&config_file);
    args.apply_overrides(&mut config);
    config.validate()?;
    tracing::info!(path = %config_file.display(), "Configuration resolved");

    let env_override = std::env::var_os("RUST_LOG").is_some();
    if let Err(e) = apply_log_level(&log_handle, &config.general.log_level, env_override) {
        tracing::warn!(level = %config.general.log_level, error = %e, "Keeping startup log level");
    }

    // Storage.
    let data_dir = resolve_data_dir(&config.general.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }

    let db_path = data_dir.join("parley.db");
    let db = Arc::new(Database::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");
    let store = Arc::new(SqliteConversationStore::new(MessageRepository::new(db)));

    // Model and memory service.
    let templates = Arc::new(PromptTemplates::from_config(&config.llm)?);
    let generator = Arc::new(OpenAiTextGenerator::from_config(&config.llm, templates)?);
    tracing::info!(api_base = %config.llm.api_base, model = %config.llm.model, "Text generator ready");

    let memory = Arc::new(HttpMemoryClient::new(&config.memory)?);
    tracing::info!(base_url = %config.memory.base_url, index = %memory.index(), "Memory client ready");

    let orchestrator = Arc::new(TurnOrchestrator::new(
        store,
        memory.clone(),
        generator,
        OrchestratorSettings::from(&config),
    ));

    // === API server ===

    let state = AppState::new(config.clone(), orchestrator, memory);
    routes::start_server(&config, state).await?;

    Ok(())
}
