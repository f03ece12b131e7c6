use chrono::Utc;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::context::EngineContext;
use crate::embedding::EmbeddingService;
use crate::enrich::dom_candidate::DomCandidate;
use crate::error::{EmbeddingError, EnrichError};
use crate::matcher::best_match::{CandidateIndex, Selection};
use crate::matcher::healing::AmbiguityNote;
use crate::record::{ElementRecord, Geometry};

/// A record the enricher looked at but could not bind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmatchedRecord {
    pub id: String,
    pub unique_name: String,
    /// Best score seen, if any candidate had text at all.
    pub best_score: Option<f32>,
}

/// Outcome of one enrichment pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EnrichmentReport {
    /// Records bound to a live candidate in this pass, as persisted.
    pub matched: Vec<ElementRecord>,
    pub unmatched: Vec<UnmatchedRecord>,
    pub skipped_external: usize,
    pub skipped_already_matched: usize,
    pub skipped_unlabeled: usize,
}

impl EnrichmentReport {
    pub fn matched_count(&self) -> usize {
        self.matched.len()
    }

    pub fn unmatched_count(&self) -> usize {
        self.unmatched.len()
    }
}

/// Binds OCR-derived records to live DOM candidates and persists the merge.
pub struct Enricher<'c> {
    ctx: &'c EngineContext,
    source_url: Option<String>,
}

impl<'c> Enricher<'c> {
    pub fn new(ctx: &'c EngineContext) -> Self {
        Self { ctx, source_url: None }
    }

    /// Record the page URL on every record bound in this pass.
    pub fn with_source_url(mut self, url: &str) -> Self {
        self.source_url = Some(url.to_string());
        self
    }

    /// Match every eligible record against `candidates` and persist matches
    /// in a single batch.
    ///
    /// A record is eligible when it is not external, not yet DOM-matched and
    /// has a label. Stored state wins over the passed-in copy for the
    /// `dom_matched` flag, so repeating a pass is a no-op.
    pub fn enrich(
        &self,
        records: &[ElementRecord],
        candidates: &[DomCandidate],
    ) -> Result<EnrichmentReport, EnrichError> {
        let mut report = EnrichmentReport::default();
        let mut eligible: Vec<ElementRecord> = Vec::new();

        for record in records {
            if record.external {
                report.skipped_external += 1;
                continue;
            }
            let stored_matched = self.ctx.store.get(&record.id)?.is_some_and(|r| r.dom_matched);
            if record.dom_matched || stored_matched {
                report.skipped_already_matched += 1;
                continue;
            }
            if !record.is_enrichable() {
                report.skipped_unlabeled += 1;
                continue;
            }
            eligible.push(record.clone());
        }

        if eligible.is_empty() {
            debug!("no records eligible for enrichment");
            return Ok(report);
        }

        let embedder = self.ctx.embedder.as_ref();
        let texts: Vec<String> = candidates.iter().map(|c| c.candidate_text().to_lowercase()).collect();
        let index = CandidateIndex::build(embedder, &texts)?;
        let threshold = self.ctx.settings.match_threshold;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.ctx.settings.enrichment_workers.max(1))
            .build()?;

        let selections: Vec<Result<(Option<Selection>, Option<f32>), EmbeddingError>> = pool.install(|| {
            eligible
                .par_iter()
                .map(|record| match_record(embedder, &index, record, threshold))
                .collect()
        });

        let now = Utc::now();
        let mut to_persist = Vec::new();
        for (record, result) in eligible.into_iter().zip(selections) {
            let (selection, best_score) = result?;
            match selection {
                Some(sel) => {
                    if sel.is_ambiguous() {
                        AmbiguityNote {
                            context: format!("enriching '{}'", record.unique_name),
                            kept: describe_candidate(&candidates[sel.index]),
                            discarded: sel.tied.iter().map(|i| describe_candidate(&candidates[*i])).collect(),
                            score: Some(sel.score),
                        }
                        .log();
                    }
                    let mut merged = merge_candidate(record, &candidates[sel.index], now);
                    if self.source_url.is_some() {
                        merged.source_url = self.source_url.clone();
                    }
                    debug!(unique_name = %merged.unique_name, score = sel.score, "bound to live element");
                    to_persist.push(merged);
                }
                None => report.unmatched.push(UnmatchedRecord {
                    id: record.id.clone(),
                    unique_name: record.unique_name.clone(),
                    best_score,
                }),
            }
        }

        if !to_persist.is_empty() {
            self.ctx.store.upsert_many(to_persist.clone())?;
        }
        report.matched = to_persist;

        info!(
            matched = report.matched_count(),
            unmatched = report.unmatched_count(),
            skipped_external = report.skipped_external,
            skipped_already_matched = report.skipped_already_matched,
            "enrichment pass complete"
        );
        Ok(report)
    }
}

fn match_record(
    embedder: &dyn EmbeddingService,
    index: &CandidateIndex,
    record: &ElementRecord,
    threshold: f32,
) -> Result<(Option<Selection>, Option<f32>), EmbeddingError> {
    let query = embedder.embed(&record.label_text.trim().to_lowercase())?;
    // Threshold below any cosine value: always yields the arg-max.
    let best = index.best_for(&query, -2.0);
    let best_score = best.as_ref().map(|s| s.score);
    Ok((best.filter(|s| s.score > threshold), best_score))
}

fn describe_candidate(candidate: &DomCandidate) -> String {
    format!("<{}> '{}'", candidate.tag_name, candidate.candidate_text())
}

/// Copy live attributes onto the record and flag it as bound.
pub fn merge_candidate(
    mut record: ElementRecord,
    candidate: &DomCandidate,
    at: chrono::DateTime<Utc>,
) -> ElementRecord {
    record.tag_name = candidate.tag_name.to_lowercase();
    record.dom_id = candidate.id.clone();
    record.dom_class = candidate.class.clone();
    record.value = candidate.value.clone();
    record.placeholder = candidate.placeholder.clone();
    if !candidate.text.trim().is_empty() {
        record.text = candidate.text.trim().to_string();
    }
    record.input_type = candidate.input_type.clone();
    record.enabled = candidate.enabled;
    record.visible = candidate.visible;
    record.editable = candidate.editable;
    record.geometry = Geometry::new(candidate.x, candidate.y, candidate.width, candidate.height);
    for (k, v) in &candidate.data_attrs {
        record.data_attrs.insert(k.clone(), v.clone());
    }
    record.mark_dom_matched(at);
    record
}
