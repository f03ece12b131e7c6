use serde::Serialize;
use tracing::info;

use crate::embedding::EmbeddingService;
use crate::error::EmbeddingError;
use crate::matcher::best_match::best_match;
use crate::record::ElementRecord;

/// Informational note when more than one candidate qualified and the first
/// one was kept. Logged, never raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmbiguityNote {
    pub context: String,
    pub kept: String,
    pub discarded: Vec<String>,
    pub score: Option<f32>,
}

impl AmbiguityNote {
    pub fn log(&self) {
        info!(
            context = %self.context,
            kept = %self.kept,
            discarded = ?self.discarded,
            score = ?self.score,
            "ambiguous match, kept first candidate"
        );
    }
}

/// Text a stored record is matched on during self-healing.
pub fn describe_record(record: &ElementRecord) -> String {
    let mut parts: Vec<String> = [
        &record.unique_name,
        &record.label_text,
        &record.intent,
        &record.ocr_type,
        &record.tag_name,
        &record.placeholder,
    ]
    .into_iter()
    .filter(|s| !s.trim().is_empty())
    .cloned()
    .collect();

    if !record.data_attrs.is_empty() {
        if let Ok(json) = serde_json::to_string(&record.data_attrs) {
            parts.push(json);
        }
    }
    if let Some(sample) = record.sample_value.as_deref().filter(|s| !s.trim().is_empty()) {
        parts.push(sample.to_string());
    }
    parts.join(" ")
}

/// A stored record chosen to stand in for a name that failed to resolve.
#[derive(Debug, Clone)]
pub struct HealCandidate {
    pub record: ElementRecord,
    pub score: f32,
}

/// Pick the stored record most similar to `query`. Every record is a
/// candidate, including one whose own strategies just failed.
pub fn find_heal_candidate(
    embedder: &dyn EmbeddingService,
    query: &str,
    records: &[ElementRecord],
    threshold: f32,
) -> Result<Option<HealCandidate>, EmbeddingError> {
    let candidates: Vec<&ElementRecord> = records.iter().collect();

    let selection = best_match(embedder, query, &candidates, |r| describe_record(r), threshold)?;

    Ok(selection.map(|sel| {
        if sel.is_ambiguous() {
            AmbiguityNote {
                context: format!("self-healing '{}'", query),
                kept: candidates[sel.index].unique_name.clone(),
                discarded: sel.tied.iter().map(|i| candidates[*i].unique_name.clone()).collect(),
                score: Some(sel.score),
            }
            .log();
        }
        HealCandidate {
            record: candidates[sel.index].clone(),
            score: sel.score,
        }
    }))
}
