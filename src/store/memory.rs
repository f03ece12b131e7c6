use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::StoreError;
use crate::record::ElementRecord;
use crate::store::{ElementStore, apply_upserts, pick_by_unique_name};

/// Process-local store. Iteration order is by id.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<BTreeMap<String, ElementRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<ElementRecord>) -> Self {
        let mut map = BTreeMap::new();
        apply_upserts(&mut map, records);
        InMemoryStore {
            records: RwLock::new(map),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ElementStore for InMemoryStore {
    fn get(&self, id: &str) -> Result<Option<ElementRecord>, StoreError> {
        let map = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(id).cloned())
    }

    fn get_by_unique_name(&self, unique_name: &str) -> Result<Option<ElementRecord>, StoreError> {
        let map = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(pick_by_unique_name(map.values(), unique_name))
    }

    fn get_by_page(&self, page_name: &str) -> Result<Vec<ElementRecord>, StoreError> {
        let map = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.values().filter(|r| r.page_name == page_name).cloned().collect())
    }

    fn all(&self) -> Result<Vec<ElementRecord>, StoreError> {
        let map = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.values().cloned().collect())
    }

    fn upsert_many(&self, records: Vec<ElementRecord>) -> Result<(), StoreError> {
        let mut map = self.records.write().map_err(|_| StoreError::Poisoned)?;
        apply_upserts(&mut map, records);
        Ok(())
    }
}
