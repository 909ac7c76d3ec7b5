//! In-memory storage implementation.
//!
//! A simple in-memory implementation of [`MirrorStorage`] for unit tests and
//! for embeddings that want the collection machinery without persistence.

use std::collections::HashMap;
use std::sync::RwLock;

use super::storage::{merge_into_snapshot, MirrorStorage, StorageResult};
use super::types::{LoggedUpdate, UpdateOrigin};

/// In-memory mirror storage.
///
/// Thread-safe via `RwLock`; all data is lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    /// Snapshots (storage key -> binary state)
    snapshots: RwLock<HashMap<String, Vec<u8>>>,

    /// Update logs (storage key -> list of updates)
    updates: RwLock<HashMap<String, Vec<StoredUpdate>>>,

    /// Counter for assigning update IDs
    next_id: RwLock<i64>,
}

#[derive(Debug, Clone)]
struct StoredUpdate {
    id: i64,
    data: Vec<u8>,
    timestamp: i64,
    origin: UpdateOrigin,
}

impl MemoryStorage {
    /// Create a new empty in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    fn next_update_id(&self) -> i64 {
        let mut id = self.next_id.write().unwrap();
        *id += 1;
        *id
    }
}

impl MirrorStorage for MemoryStorage {
    fn load_snapshot(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let snapshots = self.snapshots.read().unwrap();
        Ok(snapshots.get(key).cloned())
    }

    fn save_snapshot(&self, key: &str, state: &[u8]) -> StorageResult<()> {
        let mut snapshots = self.snapshots.write().unwrap();
        snapshots.insert(key.to_string(), state.to_vec());
        Ok(())
    }

    fn delete_collection(&self, key: &str) -> StorageResult<()> {
        let mut snapshots = self.snapshots.write().unwrap();
        let mut updates = self.updates.write().unwrap();
        snapshots.remove(key);
        updates.remove(key);
        Ok(())
    }

    fn list_keys(&self) -> StorageResult<Vec<String>> {
        let snapshots = self.snapshots.read().unwrap();
        let updates = self.updates.read().unwrap();
        let mut keys: Vec<String> = snapshots.keys().chain(updates.keys()).cloned().collect();
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    fn append_update(&self, key: &str, update: &[u8], origin: UpdateOrigin) -> StorageResult<i64> {
        let id = self.next_update_id();
        let stored = StoredUpdate {
            id,
            data: update.to_vec(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            origin,
        };

        let mut updates = self.updates.write().unwrap();
        updates.entry(key.to_string()).or_default().push(stored);

        Ok(id)
    }

    fn updates_since(&self, key: &str, since_id: i64) -> StorageResult<Vec<LoggedUpdate>> {
        let updates = self.updates.read().unwrap();
        let log = updates.get(key).map(|u| u.as_slice()).unwrap_or(&[]);

        Ok(log
            .iter()
            .filter(|u| u.id > since_id)
            .map(|u| LoggedUpdate {
                update_id: u.id,
                storage_key: key.to_string(),
                data: u.data.clone(),
                timestamp: u.timestamp,
                origin: u.origin,
            })
            .collect())
    }

    fn compact(&self, key: &str, keep_updates: usize) -> StorageResult<()> {
        let folded: Vec<Vec<u8>> = {
            let mut updates = self.updates.write().unwrap();
            let Some(log) = updates.get_mut(key) else {
                return Ok(());
            };
            if log.len() <= keep_updates {
                return Ok(());
            }
            let drain_count = log.len() - keep_updates;
            log.drain(0..drain_count).map(|u| u.data).collect()
        };

        // Fold the dropped rows into the snapshot so replay still
        // reconstructs the full collection.
        let base = self.load_snapshot(key)?;
        let merged = merge_into_snapshot(base.as_deref(), &folded);
        self.save_snapshot(key, &merged)
    }

    fn latest_update_id(&self, key: &str) -> StorageResult<i64> {
        let updates = self.updates.read().unwrap();
        Ok(updates
            .get(key)
            .and_then(|u| u.last())
            .map(|u| u.id)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_snapshot() {
        let storage = MemoryStorage::new();
        let data = b"collection state";

        storage.save_snapshot("trip", data).unwrap();
        let loaded = storage.load_snapshot("trip").unwrap();

        assert_eq!(loaded, Some(data.to_vec()));
    }

    #[test]
    fn test_load_nonexistent_snapshot() {
        let storage = MemoryStorage::new();
        let loaded = storage.load_snapshot("nonexistent").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_delete_collection() {
        let storage = MemoryStorage::new();
        storage.save_snapshot("trip", b"data").unwrap();
        storage
            .append_update("trip", b"update", UpdateOrigin::Local)
            .unwrap();

        storage.delete_collection("trip").unwrap();

        assert!(storage.load_snapshot("trip").unwrap().is_none());
        assert!(storage.all_updates("trip").unwrap().is_empty());
    }

    #[test]
    fn test_list_keys_covers_snapshots_and_logs() {
        let storage = MemoryStorage::new();
        storage.save_snapshot("a", b"data").unwrap();
        storage
            .append_update("b", b"update", UpdateOrigin::Local)
            .unwrap();

        assert_eq!(storage.list_keys().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_append_and_get_updates() {
        let storage = MemoryStorage::new();

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
    fn test_keys_are_independent() {
        let storage = MemoryStorage::new();
        storage
            .append_update("a", b"update-a", UpdateOrigin::Local)
            .unwrap();
        storage
            .append_update("b", b"update-b", UpdateOrigin::Local)
            .unwrap();

        assert_eq!(storage.all_updates("a").unwrap().len(), 1);
        assert_eq!(storage.all_updates("b").unwrap().len(), 1);
        assert_eq!(storage.all_updates("a").unwrap()[0].data, b"update-a");
    }

    #[test]
    fn test_compact_keeps_recent_rows() {
        let storage = MemoryStorage::new();

        for i in 0..10 {
            storage
                .append_update("trip", format!("update{}", i).as_bytes(), UpdateOrigin::Local)
                .unwrap();
        }

        assert_eq!(storage.all_updates("trip").unwrap().len(), 10);

        storage.compact("trip", 3).unwrap();

        let remaining = storage.all_updates("trip").unwrap();
        assert_eq!(remaining.len(), 3);
        // Folding wrote a snapshot even though the dropped rows were not
        // decodable yrs updates
        assert!(storage.load_snapshot("trip").unwrap().is_some());
    }

    #[test]
    fn test_latest_update_id() {
        let storage = MemoryStorage::new();

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
}
