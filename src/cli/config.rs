use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::context::{
    DEFAULT_ACTION_TIMEOUT_MS, DEFAULT_ENRICHMENT_WORKERS, DEFAULT_HEALING_THRESHOLD, DEFAULT_MATCH_THRESHOLD,
    EngineSettings,
};
use crate::embedding::ngram::DEFAULT_DIMENSION;
use crate::embedding::ollama::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "resilient-locator.yaml";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "resilient-locator",
    version,
    about = "Capture UI element records and resolve them back to live elements with self-healing"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: resilient-locator.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Element store file (overrides store.path)
    #[arg(long, global = true)]
    pub store: Option<String>,

    /// Ollama embed endpoint (overrides embedding.endpoint)
    #[arg(long, global = true)]
    pub ollama_endpoint: Option<String>,

    /// Ollama embedding model (overrides embedding.model)
    #[arg(long, global = true)]
    pub ollama_model: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store vision extraction output for a page
    Ingest {
        /// Page URL, screenshot filename or logical page name
        #[arg(long)]
        page: String,

        /// JSON array of elements, or `label - type - intent` lines
        #[arg(long)]
        file: String,
    },

    /// Register an element by hand (never enriched)
    Register {
        #[arg(long)]
        page: String,

        /// Logical element type (textbox, button, label, ...)
        #[arg(long)]
        ocr_type: String,

        #[arg(long, default_value = "")]
        tag_name: String,

        #[arg(long, default_value = "")]
        label_text: String,

        #[arg(long, default_value = "")]
        placeholder: String,

        #[arg(long, default_value = "")]
        text: String,

        #[arg(long, default_value = "")]
        value: String,

        #[arg(long, default_value = "")]
        intent: String,

        #[arg(long, default_value = "")]
        dom_id: String,

        #[arg(long, default_value = "")]
        dom_class: String,

        /// Value of the element's data-test attribute
        #[arg(long)]
        test_id: Option<String>,

        /// Explicit CSS selector tried last
        #[arg(long)]
        selector: Option<String>,

        #[arg(long)]
        sample_value: Option<String>,
    },

    /// Bind a page's stored records to live DOM elements
    Enrich {
        /// URL to open
        #[arg(long)]
        url: String,

        /// Logical page name (default: derived from the URL)
        #[arg(long)]
        page: Option<String>,
    },

    /// Resolve one stored element on a live page
    Resolve {
        #[arg(long)]
        url: String,

        /// Unique name of the stored element
        #[arg(long)]
        name: String,

        /// click, fill or assert
        #[arg(long, default_value = "assert")]
        action: String,

        /// Value typed when action is fill
        #[arg(long)]
        value: Option<String>,
    },

    /// Print stored records for a page as JSON
    List {
        #[arg(long)]
        page: String,
    },

    /// Run scenario YAML files whose steps reference stored elements
    Run {
        /// Path to a scenario YAML file or a directory of them
        #[arg(long)]
        spec: String,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `resilient-locator.yaml`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub resolution: ResolutionConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub trace: TraceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchingConfig {
    #[serde(default = "default_healing_threshold")]
    pub healing_threshold: f32,

    #[serde(default = "default_match_threshold")]
    pub match_threshold: f32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            healing_threshold: DEFAULT_HEALING_THRESHOLD,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolutionConfig {
    #[serde(default = "default_action_timeout_ms")]
    pub action_timeout_ms: u64,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            action_timeout_ms: DEFAULT_ACTION_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichmentConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_ENRICHMENT_WORKERS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// `ngram` (offline) or `ollama`
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default = "default_dimension")]
    pub dimension: usize,

    pub endpoint: Option<String>,
    pub model: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            dimension: DEFAULT_DIMENSION,
            endpoint: None,
            model: None,
        }
    }
}

impl EmbeddingConfig {
    pub fn endpoint_or_default(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrowserConfig {
    #[serde(default = "default_server_script")]
    pub server_script: String,

    #[serde(default = "default_true")]
    pub headless: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            server_script: default_server_script(),
            headless: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TraceConfig {
    /// JSONL file for resolution traces; disabled when unset
    pub path: Option<String>,
}

// Serde default helpers
fn default_healing_threshold() -> f32 { DEFAULT_HEALING_THRESHOLD }
fn default_match_threshold() -> f32 { DEFAULT_MATCH_THRESHOLD }
fn default_action_timeout_ms() -> u64 { DEFAULT_ACTION_TIMEOUT_MS }
fn default_workers() -> usize { DEFAULT_ENRICHMENT_WORKERS }
fn default_backend() -> String { "ngram".to_string() }
fn default_dimension() -> usize { DEFAULT_DIMENSION }
fn default_store_path() -> String { "element_records.json".to_string() }
fn default_server_script() -> String { crate::browser::session::DEFAULT_SERVER_SCRIPT.to_string() }
fn default_true() -> bool { true }

impl AppConfig {
    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("matching.healing_threshold", self.matching.healing_threshold),
            ("matching.match_threshold", self.matching.match_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { field, value });
            }
        }
        if self.enrichment.workers == 0 {
            return Err(ConfigError::Zero {
                field: "enrichment.workers",
            });
        }
        if self.embedding.dimension == 0 {
            return Err(ConfigError::Zero {
                field: "embedding.dimension",
            });
        }
        if self.resolution.action_timeout_ms == 0 {
            return Err(ConfigError::Zero {
                field: "resolution.action_timeout_ms",
            });
        }
        match self.embedding.backend.as_str() {
            "ngram" | "ollama" => Ok(()),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            healing_threshold: self.matching.healing_threshold,
            match_threshold: self.matching.match_threshold,
            action_timeout: Duration::from_millis(self.resolution.action_timeout_ms),
            enrichment_workers: self.enrichment.workers,
        }
    }

    /// Apply global CLI overrides (CLI > config file > defaults).
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(store) = &cli.store {
            self.store.path = store.clone();
        }
        if let Some(endpoint) = &cli.ollama_endpoint {
            self.embedding.endpoint = Some(endpoint.clone());
        }
        if let Some(model) = &cli.ollama_model {
            self.embedding.model = Some(model.clone());
        }
    }
}

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if the file is missing or
/// malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_FILE);
    match std::fs::read_to_string(config_path) {
        Ok(content) => match serde_yaml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = config_path, error = %e, "malformed config file, using defaults");
                AppConfig::default()
            }
        },
        Err(_) => AppConfig::default(),
    }
}
