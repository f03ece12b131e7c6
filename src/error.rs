use std::fmt;

use thiserror::Error;

// ============================================================================
// Store errors
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read element store '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to write element store '{path}': {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("element store '{path}' is not valid JSON: {source}")]
    Corrupt {
        path: String,
        source: serde_json::Error,
    },

    #[error("failed to serialize element records: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("element store lock poisoned")]
    Poisoned,
}

// ============================================================================
// Embedding errors
// ============================================================================

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },

    #[error("embedding backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("embedding backend returned {got} vectors for {expected} inputs")]
    Shape { expected: usize, got: usize },
}

// ============================================================================
// Browser session errors
// ============================================================================

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to spawn {script} (is Node.js installed?): {source}")]
    Spawn {
        script: String,
        source: std::io::Error,
    },

    #[error("browser session I/O: {0}")]
    Io(String),

    #[error("JSON error ({context}): {source}")]
    Json {
        context: String,
        source: serde_json::Error,
    },

    /// The browser server rejected a single command. The session itself is
    /// still usable.
    #[error("browser command '{command}' failed: {error}")]
    Protocol { command: String, error: String },
}

impl SessionError {
    /// A rejected command (bad selector, timeout) is a per-call miss; anything
    /// else means the session is gone.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SessionError::Protocol { .. })
    }
}

// ============================================================================
// Resolution errors
// ============================================================================

/// How the single healing attempt ended.
#[derive(Debug, Clone, PartialEq)]
pub enum HealingOutcome {
    /// No stored record scored above the healing threshold.
    NoCandidate { threshold: f32 },
    /// A record was chosen but none of its strategies matched the page.
    CandidateFailed { healed_to: String, score: f32 },
    /// The embedding backend could not score candidates.
    Unavailable(String),
}

impl fmt::Display for HealingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealingOutcome::NoCandidate { threshold } => {
                write!(f, "no stored element scored above {:.2}", threshold)
            }
            HealingOutcome::CandidateFailed { healed_to, score } => write!(
                f,
                "healed to '{}' (score {:.3}) but it was not found either",
                healed_to, score
            ),
            HealingOutcome::Unavailable(reason) => {
                write!(f, "similarity backend unavailable: {}", reason)
            }
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("locator not found for '{unique_name}' (self-healing attempted: {healing})")]
pub struct LocatorNotFoundError {
    pub unique_name: String,
    pub healing: HealingOutcome,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    NotFound(#[from] LocatorNotFoundError),

    #[error("element store error during resolution: {0}")]
    Store(#[from] StoreError),

    #[error("browser session error during resolution: {0}")]
    Session(#[from] SessionError),
}

// ============================================================================
// Enrichment errors
// ============================================================================

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("failed to build enrichment worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("embedding failed during enrichment: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("failed to persist enriched records: {0}")]
    Store(#[from] StoreError),

    #[error("failed to read live candidates: {0}")]
    Session(#[from] SessionError),
}

// ============================================================================
// Config errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be within [0, 1], got {value}")]
    ThresholdOutOfRange { field: &'static str, value: f32 },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("unknown embedding backend '{0}' (expected 'ngram' or 'ollama')")]
    UnknownBackend(String),
}

// ============================================================================
// Scenario step errors
// ============================================================================

#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Session(#[from] SessionError),
}
