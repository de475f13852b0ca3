//! In-process key/value store.
//!
//! Values are kept as serialized text so stored data goes through the same
//! parse step as on disk, and corrupt blobs can be planted for tests.

use super::{encode_blob, parse_blob, KeyValueStore, StoreError, StoreResult};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

// `text: None` marks a removed key; its revision is kept.
#[derive(Debug, Clone)]
struct Entry {
    text: Option<String>,
    revision: u64,
}

/// Map-backed store for single-threaded embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RefCell<BTreeMap<String, Entry>>,
    reject_writes: Cell<bool>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `text` verbatim under `key`, bypassing JSON encoding.
    pub fn insert_raw(&self, key: &str, text: impl Into<String>) {
        self.write_text(key, text.into());
    }

    /// Makes every subsequent write fail with `WriteRejected` until reset.
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.set(reject);
    }

    fn check_writable(&self, key: &str) -> StoreResult<()> {
        if self.reject_writes.get() {
            return Err(StoreError::WriteRejected {
                key: key.to_string(),
                reason: "storage quota exceeded".to_string(),
            });
        }
        Ok(())
    }

    fn write_text(&self, key: &str, text: String) -> u64 {
        let mut entries = self.entries.borrow_mut();
        let revision = entries.get(key).map_or(0, |entry| entry.revision) + 1;
        entries.insert(
            key.to_string(),
            Entry {
                text: Some(text),
                revision,
            },
        );
        revision
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn load(&self, key: &str) -> StoreResult<Option<Value>> {
        let entries = self.entries.borrow();
        entries
            .get(key)
            .and_then(|entry| entry.text.as_deref())
            .map(|text| parse_blob(key, text))
            .transpose()
    }

    fn save(&self, key: &str, value: &Value) -> StoreResult<()> {
        self.check_writable(key)?;
        let text = encode_blob(value)?;
        self.write_text(key, text);
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.check_writable(key)?;
        if let Some(entry) = self.entries.borrow_mut().get_mut(key) {
            if entry.text.take().is_some() {
                entry.revision += 1;
            }
        }
        Ok(())
    }

    fn revision(&self, key: &str) -> StoreResult<u64> {
        Ok(self
            .entries
            .borrow()
            .get(key)
            .map_or(0, |entry| entry.revision))
    }

    fn save_if_revision(&self, key: &str, value: &Value, expected: u64) -> StoreResult<u64> {
        self.check_writable(key)?;
        let actual = self.revision(key)?;
        if actual != expected {
            return Err(StoreError::StaleRevision {
                key: key.to_string(),
                expected,
                actual,
            });
        }
        let text = encode_blob(value)?;
        Ok(self.write_text(key, text))
    }
}
