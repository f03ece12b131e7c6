use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::debug;

use crate::error::StoreError;
use crate::record::ElementRecord;
use crate::store::{ElementStore, apply_upserts, pick_by_unique_name};

/// Whole-collection JSON file.
///
/// Loaded once on open and rewritten (temp file + rename) after every
/// upsert batch. The file is a JSON array of flat records.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: RwLock<BTreeMap<String, ElementRecord>>,
}

impl JsonFileStore {
    /// Open the store, starting empty if the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut map = BTreeMap::new();

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| StoreError::Read {
                path: path.display().to_string(),
                source: e,
            })?;
            if !content.trim().is_empty() {
                let records: Vec<ElementRecord> =
                    serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
                        path: path.display().to_string(),
                        source: e,
                    })?;
                apply_upserts(&mut map, records);
            }
        }

        debug!(path = %path.display(), records = map.len(), "opened element store");
        Ok(JsonFileStore {
            path,
            records: RwLock::new(map),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, map: &BTreeMap<String, ElementRecord>) -> Result<(), StoreError> {
        let records: Vec<&ElementRecord> = map.values().collect();
        let json = serde_json::to_string_pretty(&records).map_err(StoreError::Serialize)?;

        let write_err = |e: std::io::Error| StoreError::Write {
            path: self.path.display().to_string(),
            source: e,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(write_err)?;
        std::fs::rename(&tmp, &self.path).map_err(write_err)?;
        Ok(())
    }
}

impl ElementStore for JsonFileStore {
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
        let count = records.len();
        // memory only changes once the file write succeeded
        let mut next = map.clone();
        apply_upserts(&mut next, records);
        self.persist(&next)?;
        *map = next;
        debug!(path = %self.path.display(), count, "persisted element records");
        Ok(())
    }
}
