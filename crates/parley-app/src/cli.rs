//! CLI argument definitions for the Parley server.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use parley_core::config::ParleyConfig;
use std::path::PathBuf;

/// Parley: a retrieval-augmented chat backend.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Data directory for the SQLite chat log.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > PARLEY_CONFIG env var > ~/.parley/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("PARLEY_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Apply CLI flags and environment variables on top of the loaded config.
    pub fn apply_overrides(&self, config: &mut ParleyConfig) {
        self.apply_overrides_from(config, |key| std::env::var(key).ok());
    }

    fn apply_overrides_from(
        &self,
        config: &mut ParleyConfig,
        env: impl Fn(&str) -> Option<String>,
    ) {
        if let Some(port) = self
            .port
            .or_else(|| env("PARLEY_PORT").and_then(|v| v.parse::<u16>().ok()))
        {
            config.general.port = port;
        }
        if let Some(host) = env("PARLEY_HOST").filter(|h| !h.trim().is_empty()) {
            config.server.host = host;
        }
        if let Some(ref dir) = self.data_dir {
            config.general.data_dir = dir.to_string_lossy().to_string();
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(greeting) = env("GREETING") {
            config.general.greeting = greeting;
        }
        if let Some(url) = env("KERNEL_MEMORY_URL").filter(|u| !u.trim().is_empty()) {
            config.memory.base_url = url;
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".parley").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".parley").join("config.toml");
    }
    PathBuf::from("config.toml")
}
