pub mod best_match;
pub mod healing;

pub use best_match::{CandidateIndex, Selection, best_match, select_best};
pub use healing::{AmbiguityNote, HealCandidate, describe_record, find_heal_candidate};
