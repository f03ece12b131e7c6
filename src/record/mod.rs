pub mod element_record;
pub mod ingest;
pub mod naming;

pub use element_record::{ElementRecord, Geometry, RecordSource, UnitScore};
