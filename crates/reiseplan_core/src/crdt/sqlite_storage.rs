//! SQLite-backed storage implementation for the durable mirror.
//!
//! Persists collection snapshots and update logs to a SQLite database so the
//! collection survives process restarts.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};

use super::storage::{merge_into_snapshot, MirrorStorage, StorageResult};
use super::types::{LoggedUpdate, UpdateOrigin};
use crate::error::ReiseplanError;

/// SQLite-backed mirror storage.
///
/// # Thread Safety
///
/// The connection is wrapped in a `Mutex` for thread-safe access; the mirror's
/// writer thread and foreground reads share one connection.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open or create a SQLite database at the given path.
    ///
    /// Creates the necessary tables if they don't exist.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Create an in-memory SQLite database for testing.
    ///
    /// Data is lost when the storage is dropped.
    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(
            r#"
            -- Collection snapshots (compacted state), one row per storage key
            CREATE TABLE IF NOT EXISTS snapshots (
                key TEXT PRIMARY KEY,
                state BLOB NOT NULL,
                updated_at INTEGER NOT NULL
            );

            -- Incremental updates
            -- No foreign key: updates may arrive before the first snapshot
            CREATE TABLE IF NOT EXISTS updates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                storage_key TEXT NOT NULL,
                data BLOB NOT NULL,
                origin TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            );

            -- Index for replay and compaction queries
            CREATE INDEX IF NOT EXISTS idx_updates_key_id ON updates(storage_key, id);
            "#,
        )?;
        Ok(())
    }
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage").finish_non_exhaustive()
    }
}

impl MirrorStorage for SqliteStorage {
    fn load_snapshot(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT state FROM snapshots WHERE key = ?",
            params![key],
            |row| row.get(0),
        );

        match result {
            Ok(state) => Ok(Some(state)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(ReiseplanError::Storage(e)),
        }
    }

    fn save_snapshot(&self, key: &str, state: &[u8]) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().timestamp_millis();
        conn.execute(
            "INSERT OR REPLACE INTO snapshots (key, state, updated_at) VALUES (?, ?, ?)",
            params![key, state, now],
        )?;
        Ok(())
    }

    fn delete_collection(&self, key: &str) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM updates WHERE storage_key = ?", params![key])?;
        conn.execute("DELETE FROM snapshots WHERE key = ?", params![key])?;
        Ok(())
    }

    fn list_keys(&self) -> StorageResult<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT key FROM snapshots
             UNION SELECT DISTINCT storage_key FROM updates
             ORDER BY 1",
        )?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(keys)
    }

    fn append_update(&self, key: &str, update: &[u8], origin: UpdateOrigin) -> StorageResult<i64> {
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().timestamp_millis();
        let origin_str = origin.to_string();

        conn.execute(
            "INSERT INTO updates (storage_key, data, origin, timestamp) VALUES (?, ?, ?, ?)",
            params![key, update, origin_str, now],
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn updates_since(&self, key: &str, since_id: i64) -> StorageResult<Vec<LoggedUpdate>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, data, origin, timestamp FROM updates
             WHERE storage_key = ? AND id > ?
             ORDER BY id ASC",
        )?;

        let updates = stmt
            .query_map(params![key, since_id], |row| {
                let origin_str: String = row.get(2)?;
                Ok(LoggedUpdate {
                    update_id: row.get(0)?,
                    storage_key: key.to_string(),
                    data: row.get(1)?,
                    timestamp: row.get(3)?,
                    origin: origin_str.parse().unwrap_or(UpdateOrigin::Local),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(updates)
    }

    fn compact(&self, key: &str, keep_updates: usize) -> StorageResult<()> {
        let mut conn = self.conn.lock().unwrap();

        // Reconstruct the full state outside the write transaction. A failed
        // snapshot read must abort: folding without the base would delete
        // updates the new snapshot doesn't cover.
        let full_state = {
            let base_state: Option<Vec<u8>> = match conn.query_row(
                "SELECT state FROM snapshots WHERE key = ?",
                params![key],
                |row| row.get(0),
            ) {
                Ok(state) => Some(state),
                Err(rusqlite::Error::QueryReturnedNoRows) => None,
                Err(e) => return Err(ReiseplanError::Storage(e)),
            };

            let mut stmt =
                conn.prepare("SELECT data FROM updates WHERE storage_key = ? ORDER BY id ASC")?;
            let updates: Vec<Vec<u8>> = stmt
                .query_map(params![key], |row| row.get(0))?
                .filter_map(|r| r.ok())
                .collect();

            if base_state.is_none() && updates.is_empty() {
                return Ok(());
            }

            merge_into_snapshot(base_state.as_deref(), &updates)
        };

        let update_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM updates WHERE storage_key = ?",
            params![key],
            |row| row.get(0),
        )?;

        if update_count as usize <= keep_updates {
            return Ok(());
        }

        // Keep the newest `keep_updates` rows, delete everything older
        let cutoff_id: i64 = if keep_updates == 0 {
            i64::MAX
        } else {
            conn.query_row(
                "SELECT id FROM updates WHERE storage_key = ? ORDER BY id DESC LIMIT 1 OFFSET ?",
                params![key, keep_updates - 1],
                |row| row.get(0),
            )
            .unwrap_or(0)
        };

        let now = chrono::Utc::now().timestamp_millis();

        // Snapshot first, then delete, in one transaction: an interrupted
        // compaction must never lose folded updates.
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO snapshots (key, state, updated_at) VALUES (?, ?, ?)",
            params![key, full_state, now],
        )?;
        tx.execute(
            "DELETE FROM updates WHERE storage_key = ? AND id < ?",
            params![key, cutoff_id],
        )?;
        tx.commit()?;

        Ok(())
    }

    fn latest_update_id(&self, key: &str) -> StorageResult<i64> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT id FROM updates WHERE storage_key = ? ORDER BY id DESC LIMIT 1",
            params![key],
            |row| row.get(0),
        );

        match result {
            Ok(id) => Ok(id),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
            Err(e) => Err(ReiseplanError::Storage(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yrs::updates::decoder::Decode;
    use yrs::{Array, Doc, ReadTxn, Transact, Update};

    #[test]
    fn test_sqlite_save_and_load_snapshot() {
        let storage = SqliteStorage::in_memory().unwrap();
        let data = b"collection state";

        storage.save_snapshot("trip", data).unwrap();
        let loaded = storage.load_snapshot("trip").unwrap();

        assert_eq!(loaded, Some(data.to_vec()));
    }

    #[test]
    fn test_sqlite_load_nonexistent_snapshot() {
        let storage = SqliteStorage::in_memory().unwrap();
        let loaded = storage.load_snapshot("nonexistent").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_sqlite_delete_collection() {
        let storage = SqliteStorage::in_memory().unwrap();
        storage.save_snapshot("trip", b"data").unwrap();
        storage
            .append_update("trip", b"update", UpdateOrigin::Local)
            .unwrap();

        storage.delete_collection("trip").unwrap();

        assert!(storage.load_snapshot("trip").unwrap().is_none());
        assert!(storage.all_updates("trip").unwrap().is_empty());
    }

    #[test]
    fn test_sqlite_list_keys() {
        let storage = SqliteStorage::in_memory().unwrap();
        storage.save_snapshot("alps", b"data1").unwrap();
        // A key that only has log rows so far still shows up
        storage
            .append_update("coast", b"update", UpdateOrigin::Local)
            .unwrap();

        let keys = storage.list_keys().unwrap();

        assert_eq!(keys, vec!["alps", "coast"]);
    }

    #[test]
    fn test_sqlite_append_and_get_updates() {
        let storage = SqliteStorage::in_memory().unwrap();

        let id1 = storage
            .append_update("trip", b"update1", UpdateOrigin::Local)
            .unwrap();
        let id2 = storage
            .append_update("trip", b"update2", UpdateOrigin::Import)
            .unwrap();
        let id3 = storage
            .append_update("trip", b"update3", UpdateOrigin::Remote)
            .unwrap();

        assert!(id1 < id2);
        assert!(id2 < id3);

        let all = storage.all_updates("trip").unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].origin, UpdateOrigin::Local);
        assert_eq!(all[1].origin, UpdateOrigin::Import);

        let since_id1 = storage.updates_since("trip", id1).unwrap();
        assert_eq!(since_id1.len(), 2);
        assert_eq!(since_id1[0].update_id, id2);
    }

    #[test]
    fn test_sqlite_latest_update_id() {
        let storage = SqliteStorage::in_memory().unwrap();

        assert_eq!(storage.latest_update_id("trip").unwrap(), 0);

        let id1 = storage
            .append_update("trip", b"update1", UpdateOrigin::Local)
            .unwrap();
        assert_eq!(storage.latest_update_id("trip").unwrap(), id1);

        let id2 = storage
            .append_update("trip", b"update2", UpdateOrigin::Local)
            .unwrap();
        assert_eq!(storage.latest_update_id("trip").unwrap(), id2);
    }

    #[test]
    fn test_sqlite_compact_preserves_state() {
        let storage = SqliteStorage::in_memory().unwrap();

        // Log real incremental yrs updates, one per mutation
        let doc = Doc::new();
        let list = doc.get_or_insert_array("notes");
        for i in 0..10 {
            let sv = doc.transact().state_vector();
            {
                let mut txn = doc.transact_mut();
                list.push_back(&mut txn, format!("entry{}", i));
            }
            let update = doc.transact().encode_state_as_update_v1(&sv);
            storage
                .append_update("trip", &update, UpdateOrigin::Local)
                .unwrap();
        }

        assert_eq!(storage.all_updates("trip").unwrap().len(), 10);

        storage.compact("trip", 3).unwrap();

        let remaining = storage.all_updates("trip").unwrap();
        assert_eq!(remaining.len(), 3);

        // Snapshot plus kept rows replay to the full collection
        let replayed = Doc::new();
        {
            let mut txn = replayed.transact_mut();
            let snapshot = storage.load_snapshot("trip").unwrap().unwrap();
            txn.apply_update(Update::decode_v1(&snapshot).unwrap()).unwrap();
            for row in &remaining {
                txn.apply_update(Update::decode_v1(&row.data).unwrap()).unwrap();
            }
        }
        let list = replayed.get_or_insert_array("notes");
        let txn = replayed.transact();
        assert_eq!(list.len(&txn), 10);
    }

    #[test]
    fn test_sqlite_compact_below_threshold_is_noop() {
        let storage = SqliteStorage::in_memory().unwrap();
        storage
            .append_update("trip", b"update1", UpdateOrigin::Local)
            .unwrap();

        storage.compact("trip", 3).unwrap();

        assert_eq!(storage.all_updates("trip").unwrap().len(), 1);
    }

    #[test]
    fn test_sqlite_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.db");

        {
            let storage = SqliteStorage::open(&path).unwrap();
            storage.save_snapshot("trip", b"snapshot").unwrap();
            storage
                .append_update("trip", b"update1", UpdateOrigin::Local)
                .unwrap();
        }

        let storage = SqliteStorage::open(&path).unwrap();
        assert_eq!(
            storage.load_snapshot("trip").unwrap(),
            Some(b"snapshot".to_vec())
        );
        assert_eq!(storage.all_updates("trip").unwrap().len(), 1);
    }
}
