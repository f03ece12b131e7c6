pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::InMemoryStore;

use std::collections::BTreeMap;

use crate::error::StoreError;
use crate::record::ElementRecord;

/// Keyed persistence for element records.
///
/// Upsert is idempotent by `id`. A stored `dom_matched = true` is never
/// cleared by a later upsert, nor are the live-page fields that came with it.
pub trait ElementStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<ElementRecord>, StoreError>;

    fn get_by_unique_name(&self, unique_name: &str) -> Result<Option<ElementRecord>, StoreError>;

    fn get_by_page(&self, page_name: &str) -> Result<Vec<ElementRecord>, StoreError>;

    fn all(&self) -> Result<Vec<ElementRecord>, StoreError>;

    fn upsert_many(&self, records: Vec<ElementRecord>) -> Result<(), StoreError>;

    fn upsert(&self, record: ElementRecord) -> Result<(), StoreError> {
        self.upsert_many(vec![record])
    }
}

/// Merge `incoming` into a map keyed by id. An unbound copy of a
/// DOM-matched record keeps the stored live-page fields along with the flag.
/// Shared by every store implementation.
pub(crate) fn apply_upserts(map: &mut BTreeMap<String, ElementRecord>, incoming: Vec<ElementRecord>) {
    for mut record in incoming {
        if let Some(existing) = map.get(&record.id) {
            record.inherit_dom_match(existing);
        }
        map.insert(record.id.clone(), record);
    }
}

/// Lookup order for `get_by_unique_name`: if several records share a name,
/// the DOM-matched one wins, then the lowest id.
pub(crate) fn pick_by_unique_name<'a>(
    records: impl Iterator<Item = &'a ElementRecord>,
    unique_name: &str,
) -> Option<ElementRecord> {
    records
        .filter(|r| r.unique_name == unique_name)
        .min_by(|a, b| b.dom_matched.cmp(&a.dom_matched).then_with(|| a.id.cmp(&b.id)))
        .cloned()
}
