//! Storage abstraction for the durable mirror.
//!
//! This module defines the [`MirrorStorage`] trait which abstracts over the
//! backends (SQLite, in-memory) that persist collection snapshots and update
//! logs, keyed by storage key.

use yrs::updates::decoder::Decode;
use yrs::{Doc, ReadTxn, Transact, Update};

use super::types::{LoggedUpdate, UpdateOrigin};
use crate::error::ReiseplanError;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, ReiseplanError>;

/// Trait for durable mirror storage backends.
///
/// The storage maintains two tables per storage key:
/// 1. **Snapshot**: compacted full state of the collection
/// 2. **Update log**: incremental updates in commit order
///
/// Replaying snapshot-then-log reconstructs the collection exactly; the log
/// also preserves recent history with its origins. One storage instance can
/// hold multiple keys, but the mirror only ever writes one key at a time.
pub trait MirrorStorage: Send + Sync {
    /// Load the compacted collection state for a key.
    ///
    /// Returns `None` if the key has no snapshot yet.
    fn load_snapshot(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Save the compacted collection state, overwriting any previous one.
    fn save_snapshot(&self, key: &str, state: &[u8]) -> StorageResult<()>;

    /// Delete a key's snapshot and all its logged updates.
    fn delete_collection(&self, key: &str) -> StorageResult<()>;

    /// List all storage keys known to this backend.
    fn list_keys(&self) -> StorageResult<Vec<String>>;

    /// Append an incremental update to the key's log.
    ///
    /// Returns the ID of the newly created log record.
    fn append_update(&self, key: &str, update: &[u8], origin: UpdateOrigin) -> StorageResult<i64>;

    /// All updates for a key with an ID greater than `since_id`, ascending.
    fn updates_since(&self, key: &str, since_id: i64) -> StorageResult<Vec<LoggedUpdate>>;

    /// All updates for a key, ascending.
    fn all_updates(&self, key: &str) -> StorageResult<Vec<LoggedUpdate>> {
        self.updates_since(key, 0)
    }

    /// Fold old updates into the key's snapshot.
    ///
    /// Merges everything below the cutoff into the base snapshot and keeps
    /// only the most recent `keep_updates` log rows. The folded snapshot must
    /// replay to the same collection as before.
    fn compact(&self, key: &str, keep_updates: usize) -> StorageResult<()>;

    /// The latest log ID for a key, or 0 if the log is empty.
    fn latest_update_id(&self, key: &str) -> StorageResult<i64>;
}

/// Merge a base snapshot and a series of updates into one state blob.
///
/// Undecodable inputs are skipped rather than failing the whole fold; the
/// mirror logs and tolerates individually corrupt rows the same way on
/// replay.
pub(crate) fn merge_into_snapshot(base: Option<&[u8]>, updates: &[Vec<u8>]) -> Vec<u8> {
    let doc = Doc::new();
    {
        let mut txn = doc.transact_mut();
        if let Some(state) = base
            && let Ok(update) = Update::decode_v1(state)
        {
            let _ = txn.apply_update(update);
        }
        for data in updates {
            if let Ok(update) = Update::decode_v1(data) {
                let _ = txn.apply_update(update);
            }
        }
    }
    let txn = doc.transact();
    txn.encode_state_as_update_v1(&Default::default())
}
