//! Application state shared across handlers.

use chunkvault_core::config::AppConfig;
use chunkvault_engine::{ChunkEngine, EngineResult, QuotaReporter};
use chunkvault_storage::ObjectStore;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Chunk reads and writes.
    pub engine: ChunkEngine,
    /// Usage reporting over the same store.
    pub quota: QuotaReporter,
}

impl AppState {
    /// Build the engine and quota reporter over an established store.
    ///
    /// Fails on invalid engine or quota settings.
    pub fn new(config: AppConfig, store: Arc<dyn ObjectStore>) -> EngineResult<Self> {
        let engine = ChunkEngine::new(store.clone(), &config.engine)?;
        let quota = QuotaReporter::new(store, &config.quota)?;

        Ok(Self {
            config: Arc::new(config),
            engine,
            quota,
        })
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        self.engine.store()
    }
}
