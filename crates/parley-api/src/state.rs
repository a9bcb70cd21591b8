//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use parley_chat::{DocumentIngestor, TurnOrchestrator};
use parley_core::config::ParleyConfig;

/// Shared application state, passed to handlers via axum's `State` extractor.
///
/// Cloning is cheap; every field is reference counted or `Copy`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration, read-only after startup.
    pub config: Arc<ParleyConfig>,
    /// Runs chat turns.
    pub orchestrator: Arc<TurnOrchestrator>,
    /// Forwards uploaded documents to the memory service.
    pub ingestor: Arc<dyn DocumentIngestor>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: ParleyConfig,
        orchestrator: Arc<TurnOrchestrator>,
        ingestor: Arc<dyn DocumentIngestor>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            orchestrator,
            ingestor,
            start_time: Instant::now(),
        }
    }
}
