//! Durable key/value store adapter.
//!
//! # Responsibility
//! - Give the repository whole-blob get/set/remove of JSON values by key.
//! - Hide the storage backend behind [`KeyValueStore`].
//!
//! # Invariants
//! - A missing key loads as `Ok(None)`; absence is a normal first-run state.
//! - `save` replaces the whole value in one call; no partial writes.
//! - Every successful write or remove bumps the key's revision by one;
//!   a key's revision never decreases.
//! - The adapter never repairs stored data; decoding happens one layer up.

use crate::db::DbError;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory;
mod sqlite;

pub use memory::MemoryKeyValueStore;
pub use sqlite::SqliteKeyValueStore;

/// Key of the project reference collection.
pub const PROJECTS_KEY: &str = "projectProposals";
/// Key of the grant application collection.
pub const APPLICATIONS_KEY: &str = "grantApplications";
/// Default file name for an on-disk store.
pub const DEFAULT_STORE_FILE_NAME: &str = "grantdesk_store.sqlite3";

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    /// Backend failure.
    Db(DbError),
    /// Stored text under `key` is not JSON.
    CorruptBlob {
        key: String,
        source: serde_json::Error,
    },
    /// Value could not be serialized.
    Encode(serde_json::Error),
    /// Another writer changed `key` since `expected` was observed.
    StaleRevision {
        key: String,
        expected: u64,
        actual: u64,
    },
    /// Backend refused the write (quota, read-only media).
    WriteRejected { key: String, reason: String },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::CorruptBlob { key, source } => {
                write!(f, "stored value for `{key}` is not valid JSON: {source}")
            }
            Self::Encode(err) => write!(f, "failed to encode value: {err}"),
            Self::StaleRevision {
                key,
                expected,
                actual,
            } => write!(
                f,
                "stale write to `{key}`: expected revision {expected}, found {actual}"
            ),
            Self::WriteRejected { key, reason } => {
                write!(f, "write to `{key}` rejected: {reason}")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::CorruptBlob { source, .. } => Some(source),
            Self::Encode(err) => Some(err),
            Self::StaleRevision { .. } | Self::WriteRejected { .. } => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Whole-value JSON persistence keyed by string.
pub trait KeyValueStore {
    /// Reads and parses the value stored under `key`.
    fn load(&self, key: &str) -> StoreResult<Option<Value>>;
    /// Overwrites the value under `key`. Last writer wins.
    fn save(&self, key: &str, value: &Value) -> StoreResult<()>;
    /// Deletes `key`; deleting a missing key succeeds.
    ///
    /// The key's revision survives the delete, so a version-checked write
    /// made against the pre-delete revision still fails.
    fn remove(&self, key: &str) -> StoreResult<()>;
    /// Current write counter for `key`; `0` when the key was never written.
    fn revision(&self, key: &str) -> StoreResult<u64>;
    /// Overwrites `key` only if its revision still equals `expected`.
    ///
    /// Returns the new revision.
    fn save_if_revision(&self, key: &str, value: &Value, expected: u64) -> StoreResult<u64>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn load(&self, key: &str) -> StoreResult<Option<Value>> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &Value) -> StoreResult<()> {
        (**self).save(key, value)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        (**self).remove(key)
    }

    fn revision(&self, key: &str) -> StoreResult<u64> {
        (**self).revision(key)
    }

    fn save_if_revision(&self, key: &str, value: &Value, expected: u64) -> StoreResult<u64> {
        (**self).save_if_revision(key, value, expected)
    }
}

fn parse_blob(key: &str, text: &str) -> StoreResult<Value> {
    serde_json::from_str(text).map_err(|source| StoreError::CorruptBlob {
        key: key.to_string(),
        source,
    })
}

fn encode_blob(value: &Value) -> StoreResult<String> {
    serde_json::to_string(value).map_err(StoreError::Encode)
}
