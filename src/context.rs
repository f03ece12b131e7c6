use std::sync::Arc;
use std::time::Duration;

use crate::embedding::EmbeddingService;
use crate::store::ElementStore;
use crate::trace::logger::TraceLogger;

pub const DEFAULT_HEALING_THRESHOLD: f32 = 0.3;
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.5;
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_ENRICHMENT_WORKERS: usize = 4;

/// Tunables shared by resolution and enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Self-healing accepts a stored record only above this similarity.
    pub healing_threshold: f32,
    /// Capture-time binding accepts a DOM candidate only above this.
    pub match_threshold: f32,
    /// Per-attempt wait for a locator to match.
    pub action_timeout: Duration,
    /// Size of the enrichment worker pool.
    pub enrichment_workers: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            healing_threshold: DEFAULT_HEALING_THRESHOLD,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            action_timeout: Duration::from_millis(DEFAULT_ACTION_TIMEOUT_MS),
            enrichment_workers: DEFAULT_ENRICHMENT_WORKERS,
        }
    }
}

/// Everything the engine needs, built once at startup and passed by
/// reference.
pub struct EngineContext {
    pub store: Arc<dyn ElementStore>,
    pub embedder: Arc<dyn EmbeddingService>,
    pub settings: EngineSettings,
    pub tracer: TraceLogger,
}

impl EngineContext {
    pub fn new(store: Arc<dyn ElementStore>, embedder: Arc<dyn EmbeddingService>) -> Self {
        Self {
            store,
            embedder,
            settings: EngineSettings::default(),
            tracer: TraceLogger::disabled(),
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_tracer(mut self, tracer: TraceLogger) -> Self {
        self.tracer = tracer;
        self
    }
}
