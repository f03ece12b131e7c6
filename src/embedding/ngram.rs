use sha1::{Digest, Sha1};

use crate::embedding::EmbeddingService;
use crate::error::EmbeddingError;

pub const DEFAULT_DIMENSION: usize = 512;

/// Offline embedder over hashed character bigrams and trigrams.
///
/// Text is lower-cased, every run of non-alphanumeric characters becomes a
/// single space and the result is padded with one space on each side, so
/// word boundaries contribute n-grams too. Each n-gram lands in a bucket
/// chosen by the first four bytes of its SHA-1 digest. The vector is
/// L2-normalised; blank text gives the zero vector.
#[derive(Debug, Clone)]
pub struct HashedNgramEmbedder {
    dimension: usize,
}

impl HashedNgramEmbedder {
    pub fn new(dimension: usize) -> Self {
        HashedNgramEmbedder {
            dimension: dimension.max(1),
        }
    }

    fn bucket(&self, gram: &[char]) -> usize {
        let s: String = gram.iter().collect();
        let digest = Sha1::digest(s.as_bytes());
        let n = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
        n as usize % self.dimension
    }
}

impl Default for HashedNgramEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

/// Lower-case, collapse non-alphanumeric runs to one space, trim.
pub fn normalize_for_embedding(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }
    out
}

impl EmbeddingService for HashedNgramEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vector = vec![0.0f32; self.dimension];
        let normalized = normalize_for_embedding(text);
        if normalized.is_empty() {
            return Ok(vector);
        }

        let padded: Vec<char> = format!(" {} ", normalized).chars().collect();
        for n in [2usize, 3] {
            for gram in padded.windows(n) {
                vector[self.bucket(gram)] += 1.0;
            }
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
