use crate::embedding::{EmbeddingService, cosine_similarity};
use crate::error::EmbeddingError;

// ============================================================================
// Selection policy
// ============================================================================

/// Winner of an arg-max over candidate scores.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Position of the winner in the caller's candidate list.
    pub index: usize,
    pub score: f32,
    /// Other candidates that scored exactly the same; they lost on order.
    pub tied: Vec<usize>,
}

impl Selection {
    pub fn is_ambiguous(&self) -> bool {
        !self.tied.is_empty()
    }
}

/// Arg-max over `(index, score)` pairs, accepted only when the best score
/// is strictly greater than `threshold`.
///
/// The first candidate in iteration order wins ties. NaN scores are
/// ignored.
pub fn select_best(scores: impl IntoIterator<Item = (usize, f32)>, threshold: f32) -> Option<Selection> {
    let mut best: Option<Selection> = None;

    for (index, score) in scores {
        if score.is_nan() {
            continue;
        }
        match best.as_mut() {
            None => {
                best = Some(Selection {
                    index,
                    score,
                    tied: Vec::new(),
                })
            }
            Some(current) if score > current.score => {
                *current = Selection {
                    index,
                    score,
                    tied: Vec::new(),
                };
            }
            Some(current) if score == current.score => current.tied.push(index),
            Some(_) => {}
        }
    }

    best.filter(|s| s.score > threshold)
}

// ============================================================================
// Pre-embedded candidates
// ============================================================================

/// Candidate vectors computed once and reused for many queries.
///
/// Candidates whose text is blank are left out but keep their original
/// position, so `Selection::index` always refers to the caller's list.
#[derive(Debug, Clone, Default)]
pub struct CandidateIndex {
    entries: Vec<(usize, Vec<f32>)>,
}

impl CandidateIndex {
    pub fn build(embedder: &dyn EmbeddingService, texts: &[String]) -> Result<Self, EmbeddingError> {
        let kept: Vec<(usize, String)> = texts
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.trim().is_empty())
            .map(|(i, t)| (i, t.clone()))
            .collect();

        let batch: Vec<String> = kept.iter().map(|(_, t)| t.clone()).collect();
        let vectors = embedder.embed_batch(&batch)?;
        if vectors.len() != kept.len() {
            return Err(EmbeddingError::Shape {
                expected: kept.len(),
                got: vectors.len(),
            });
        }

        let entries = kept.into_iter().map(|(i, _)| i).zip(vectors).collect();
        Ok(CandidateIndex { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Best candidate for an already embedded query.
    pub fn best_for(&self, query: &[f32], threshold: f32) -> Option<Selection> {
        select_best(
            self.entries.iter().map(|(i, v)| (*i, cosine_similarity(query, v))),
            threshold,
        )
    }
}

/// One-shot semantic match: embed `query` and every candidate's text, return
/// the best candidate scoring strictly above `threshold`.
pub fn best_match<T>(
    embedder: &dyn EmbeddingService,
    query: &str,
    candidates: &[T],
    to_text: impl Fn(&T) -> String,
    threshold: f32,
) -> Result<Option<Selection>, EmbeddingError> {
    if query.trim().is_empty() || candidates.is_empty() {
        return Ok(None);
    }
    let texts: Vec<String> = candidates.iter().map(to_text).collect();
    let index = CandidateIndex::build(embedder, &texts)?;
    let query_vec = embedder.embed(query)?;
    Ok(index.best_for(&query_vec, threshold))
}
