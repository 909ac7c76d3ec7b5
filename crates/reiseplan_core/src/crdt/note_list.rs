//! Replicated sequence store for the note collection.
//!
//! This module provides [`NoteListCrdt`], which wraps a yrs [`Doc`] to manage
//! the ordered note collection as a conflict-free replicated data type.
//!
//! # Structure
//!
//! The document contains a single Y.Array called "notes" whose elements are
//! JSON-encoded [`Note`] values:
//!
//! ```text
//! Y.Doc
//! └── Y.Array "notes"
//!     ├── "{\"id\":\"…\",\"name\":\"Lisbon\",…}"
//!     ├── "{\"id\":\"…\",\"name\":\"Porto\",…}"
//!     └── ...
//! ```
//!
//! Ordering and merge semantics come from yrs: insertions carry position
//! tokens relative to their causal neighbours with client-id tie-breaking,
//! deletions are tombstoned, and replaying the same updates in any
//! causally-valid order converges every replica to the same sequence.
//!
//! # Transactions
//!
//! Every mutation runs in a single yrs transaction tagged with an origin
//! ("local", "import" or "remote"), so observers only ever see committed
//! states and the durable mirror can record how each change entered the
//! collection.

use yrs::updates::decoder::Decode;
use yrs::{
    Array, ArrayRef, Doc, Observable, Origin, ReadTxn, StateVector, Transact, TransactionMut,
    Update,
};

use super::types::UpdateOrigin;
use crate::error::{ReiseplanError, Result};
use crate::model::Note;

/// The name of the Y.Array containing the note collection.
const NOTES_ARRAY_NAME: &str = "notes";

/// Transaction origin tags.
const LOCAL_ORIGIN: &str = "local";
const IMPORT_ORIGIN: &str = "import";
const REMOTE_ORIGIN: &str = "remote";

/// The replicated, ordered note collection.
///
/// Wraps a yrs [`Doc`] and provides a transactional mutation API. The store
/// holds no persistence itself; a [`super::DurableMirror`] attaches through
/// [`NoteListCrdt::observe_updates`] to log committed changes.
pub struct NoteListCrdt {
    /// The underlying yrs document
    doc: Doc,

    /// Reference to the notes array (cached for efficiency)
    list: ArrayRef,
}

impl NoteListCrdt {
    /// Create a new empty collection.
    pub fn new() -> Self {
        let doc = Doc::new();
        let list = doc.get_or_insert_array(NOTES_ARRAY_NAME);
        Self { doc, list }
    }

    // ==================== Reads ====================

    /// The resolved collection, in sequence order.
    ///
    /// Elements that fail to decode as a [`Note`] are skipped rather than
    /// failing the whole read.
    pub fn notes(&self) -> Vec<Note> {
        let txn = self.doc.transact();
        decode_notes(&self.list, &txn)
    }

    /// The note with the given id, if present.
    pub fn find_by_id(&self, id: &str) -> Option<Note> {
        let txn = self.doc.transact();
        self.list.iter(&txn).find_map(|value| {
            let json = value.to_string(&txn);
            match serde_json::from_str::<Note>(&json) {
                Ok(note) if note.id == id => Some(note),
                _ => None,
            }
        })
    }

    /// Number of elements in the collection.
    pub fn len(&self) -> usize {
        let txn = self.doc.transact();
        self.list.len(&txn) as usize
    }

    /// Whether the collection has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ==================== Mutations ====================

    /// Append a note at the logical end of the collection.
    pub fn append(&self, note: &Note) -> Result<()> {
        let json = serde_json::to_string(note)?;
        let mut txn = self.doc.transact_mut_with(LOCAL_ORIGIN);
        self.list.push_back(&mut txn, json);
        Ok(())
    }

    /// Replace the note with matching id, keeping its position.
    ///
    /// Delete-old and insert-new happen in one transaction, so no observer
    /// ever sees the entry missing. Returns `false` without touching the
    /// collection if the id is not present: updates to deleted entries are
    /// dropped rather than resurrecting them.
    pub fn replace_by_id(&self, id: &str, note: &Note) -> Result<bool> {
        let json = serde_json::to_string(note)?;
        let mut txn = self.doc.transact_mut_with(LOCAL_ORIGIN);

        match find_index(&self.list, &txn, id) {
            None => Ok(false),
            Some(index) => {
                self.list.remove_range(&mut txn, index, 1);
                self.list.insert(&mut txn, index, json);
                Ok(true)
            }
        }
    }

    /// Remove the note with matching id. No-op returning `false` if absent.
    pub fn delete_by_id(&self, id: &str) -> Result<bool> {
        let mut txn = self.doc.transact_mut_with(LOCAL_ORIGIN);

        match find_index(&self.list, &txn, id) {
            None => Ok(false),
            Some(index) => {
                self.list.remove_range(&mut txn, index, 1);
                Ok(true)
            }
        }
    }

    /// Atomically empty the collection and insert the given notes in order.
    ///
    /// Used exclusively by transport import; the single transaction
    /// guarantees observers never see a transiently empty list. Incoming
    /// notes are serialized before the transaction opens so a bad value
    /// cannot leave the collection half-replaced.
    pub fn clear_and_bulk_insert(&self, notes: &[Note]) -> Result<()> {
        let encoded: Vec<String> = notes
            .iter()
            .map(serde_json::to_string)
            .collect::<std::result::Result<_, _>>()?;

        let mut txn = self.doc.transact_mut_with(IMPORT_ORIGIN);
        let len = self.list.len(&txn);
        if len > 0 {
            self.list.remove_range(&mut txn, 0, len);
        }
        for json in encoded {
            self.list.push_back(&mut txn, json);
        }
        Ok(())
    }

    // ==================== Replication ====================

    /// Encode the full collection state as an update blob.
    ///
    /// Applying the blob to another collection brings it up to date with
    /// this one.
    pub fn encode_state_as_update(&self) -> Vec<u8> {
        let txn = self.doc.transact();
        txn.encode_state_as_update_v1(&StateVector::default())
    }

    /// Apply an encoded update (mirror replay or another replica's state).
    ///
    /// Re-applying an already-seen update is a harmless no-op.
    pub fn apply_update(&self, update: &[u8]) -> Result<()> {
        let decoded = Update::decode_v1(update)
            .map_err(|e| ReiseplanError::UpdateDecode(format!("decode failed: {}", e)))?;

        let mut txn = self.doc.transact_mut_with(REMOTE_ORIGIN);
        txn.apply_update(decoded)
            .map_err(|e| ReiseplanError::UpdateDecode(format!("apply failed: {}", e)))?;
        Ok(())
    }

    // ==================== Observers ====================

    /// Subscribe to committed document updates.
    ///
    /// The callback receives the binary update data and the origin of the
    /// transaction that produced it, once per committed transaction.
    /// Returns a subscription that unsubscribes when dropped.
    ///
    /// # Panics
    ///
    /// Panics if unable to register the document observer.
    pub fn observe_updates<F>(&self, callback: F) -> yrs::Subscription
    where
        F: Fn(&[u8], UpdateOrigin) + Send + Sync + 'static,
    {
        self.doc
            .observe_update_v1(move |txn, event| {
                callback(&event.update, origin_of(txn));
            })
            .expect("Failed to observe collection updates")
    }

    /// Subscribe to the resolved collection.
    ///
    /// The callback receives the full decoded note list once per committed
    /// transaction that touched it, never an intermediate state.
    pub fn observe_notes<F>(&self, callback: F) -> yrs::Subscription
    where
        F: Fn(Vec<Note>) + Send + Sync + 'static,
    {
        let list = self.list.clone();
        self.list.observe(move |txn, _event| {
            callback(decode_notes(&list, txn));
        })
    }
}

impl Default for NoteListCrdt {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NoteListCrdt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteListCrdt")
            .field("len", &self.len())
            .finish()
    }
}

/// Decode every element of the array that parses as a [`Note`].
fn decode_notes<T: ReadTxn>(list: &ArrayRef, txn: &T) -> Vec<Note> {
    list.iter(txn)
        .filter_map(|value| {
            let json = value.to_string(txn);
            serde_json::from_str(&json).ok()
        })
        .collect()
}

/// Index of the element whose decoded id matches, if any.
fn find_index<T: ReadTxn>(list: &ArrayRef, txn: &T, id: &str) -> Option<u32> {
    list.iter(txn)
        .position(|value| {
            let json = value.to_string(txn);
            matches!(serde_json::from_str::<Note>(&json), Ok(note) if note.id == id)
        })
        .map(|index| index as u32)
}

/// Semantic origin of a transaction, defaulting to local.
fn origin_of(txn: &TransactionMut) -> UpdateOrigin {
    match txn.origin() {
        Some(origin) if *origin == Origin::from(IMPORT_ORIGIN) => UpdateOrigin::Import,
        Some(origin) if *origin == Origin::from(REMOTE_ORIGIN) => UpdateOrigin::Remote,
        _ => UpdateOrigin::Local,
    }
}
