pub mod dom_candidate;
pub mod enricher;

pub use dom_candidate::DomCandidate;
pub use enricher::{Enricher, EnrichmentReport, UnmatchedRecord, merge_candidate};
