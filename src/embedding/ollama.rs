use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embedding::EmbeddingService;
use crate::error::EmbeddingError;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434/api/embed";
pub const DEFAULT_MODEL: &str = "all-minilm";

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

/// Embedding backend calling a local Ollama server.
pub struct OllamaEmbedder {
    endpoint: String,
    model: String,
    dimension: usize,
    client: reqwest::blocking::Client,
}

impl OllamaEmbedder {
    /// `dimension` is what the model is expected to return; it is only
    /// reported, not enforced.
    pub fn new(endpoint: &str, model: &str, dimension: usize) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        OllamaEmbedder {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            dimension,
            client,
        }
    }

    fn request(&self, input: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbedRequest {
                model: &self.model,
                input,
            })
            .send()
            .map_err(|e| EmbeddingError::Http {
                endpoint: self.endpoint.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbedResponse = response.json().map_err(|e| EmbeddingError::Http {
            endpoint: self.endpoint.clone(),
            source: e,
        })?;

        if parsed.embeddings.len() != input.len() {
            return Err(EmbeddingError::Shape {
                expected: input.len(),
                got: parsed.embeddings.len(),
            });
        }
        debug!(model = %self.model, count = input.len(), "embedded batch");
        Ok(parsed.embeddings)
    }
}

impl EmbeddingService for OllamaEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.request(&[text.to_string()])?;
        vectors.pop().ok_or(EmbeddingError::Shape { expected: 1, got: 0 })
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
