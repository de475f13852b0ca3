//! SQLite-backed key/value store.
//!
//! # Invariants
//! - One row per key in `kv_entries`; `value` holds compact JSON text.
//! - `revision` starts at 1 on insert and increments on every overwrite
//!   and every remove; it never goes back.
//! - Removing a key keeps its row as a tombstone (`value IS NULL`).

use super::{encode_blob, parse_blob, KeyValueStore, StoreError, StoreResult};
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

const UPSERT_SQL: &str = "INSERT INTO kv_entries (key, value) VALUES (?1, ?2)
    ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        revision = kv_entries.revision + 1,
        updated_at = (strftime('%s', 'now') * 1000);";

/// Key/value store over a migrated SQLite connection.
///
/// Open the connection with [`crate::db::open_db`] or
/// [`crate::db::open_db_in_memory`] so the `kv_entries` table exists.
pub struct SqliteKeyValueStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteKeyValueStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn read_revision(conn: &Connection, key: &str) -> StoreResult<u64> {
        let revision = conn
            .query_row(
                "SELECT revision FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(revision.map_or(0, |value| u64::try_from(value).unwrap_or(0)))
    }
}

impl KeyValueStore for SqliteKeyValueStore<'_> {
    fn load(&self, key: &str) -> StoreResult<Option<Value>> {
        let text = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten();

        match text {
            Some(text) => {
                debug!("event=store_load module=store status=ok key={key} bytes={}", text.len());
                parse_blob(key, &text).map(Some)
            }
            None => {
                debug!("event=store_load module=store status=absent key={key}");
                Ok(None)
            }
        }
    }

    fn save(&self, key: &str, value: &Value) -> StoreResult<()> {
        let text = encode_blob(value)?;
        self.conn.execute(UPSERT_SQL, params![key, text])?;
        debug!("event=store_save module=store status=ok key={key} bytes={}", text.len());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE kv_entries
             SET
                value = NULL,
                revision = revision + 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE key = ?1 AND value IS NOT NULL;",
            [key],
        )?;
        if changed > 0 {
            debug!("event=store_remove module=store status=ok key={key}");
        }
        Ok(())
    }

    fn revision(&self, key: &str) -> StoreResult<u64> {
        Self::read_revision(self.conn, key)
    }

    fn save_if_revision(&self, key: &str, value: &Value, expected: u64) -> StoreResult<u64> {
        let text = encode_blob(value)?;
        let tx = self.conn.unchecked_transaction()?;

        let actual = Self::read_revision(&tx, key)?;
        if actual != expected {
            warn!(
                "event=store_save module=store status=stale key={key} expected={expected} actual={actual}"
            );
            return Err(StoreError::StaleRevision {
                key: key.to_string(),
                expected,
                actual,
            });
        }

        tx.execute(UPSERT_SQL, params![key, text])?;
        tx.commit()?;
        debug!(
            "event=store_save module=store status=ok key={key} revision={}",
            actual + 1
        );
        Ok(actual + 1)
    }
}
