//! The main Reiseplan instance.
//!
//! [`Planner`] is the process-wide context object: it owns the replicated
//! note collection, keeps it mirrored to storage under the active storage
//! key, and funnels transport operations through the one-in-flight guard.
//! It is constructed once at startup and passed explicitly to whatever
//! needs it; there is no ambient global state.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use reiseplan_core::planner::Planner;
//! use reiseplan_core::crdt::MemoryStorage;
//! use reiseplan_core::notify::LogSink;
//! use reiseplan_core::transport::MemoryClipboard;
//!
//! let planner = Planner::new(
//!     Arc::new(MemoryStorage::new()),
//!     Arc::new(MemoryClipboard::new()),
//!     Arc::new(LogSink),
//!     "default",
//! );
//!
//! let mut note = reiseplan_core::model::Note::new();
//! note.name = "Lisbon".to_string();
//! planner.add_note(&note)?;
//! ```

use std::sync::{Arc, Mutex, RwLock};

use crate::crdt::{DurableMirror, MirrorStorage, NoteListCrdt};
use crate::error::Result;
use crate::model::{CalendarDate, DateRange, GeoPoint, Note};
use crate::notify::NotificationSink;
use crate::palette::{self, NoteColor};
use crate::schedule;
use crate::selection::SelectionHub;
use crate::transport::{
    Clipboard, RemoteLog, TransportGuard, export_to_clipboard, export_to_remote_log,
    import_from_clipboard, import_from_remote_log,
};

/// Owns the active collection and its supporting services.
pub struct Planner {
    storage: Arc<dyn MirrorStorage>,
    clipboard: Arc<dyn Clipboard>,
    sink: Arc<dyn NotificationSink>,

    /// The active collection; replaced wholesale on storage key change
    store: RwLock<Arc<NoteListCrdt>>,

    /// Mirror for the active key; `None` when storage could not be opened
    mirror: Mutex<Option<DurableMirror>>,

    storage_key: RwLock<String>,
    guard: TransportGuard,
    hub: SelectionHub,
}

impl Planner {
    /// Open the collection stored under `storage_key`.
    ///
    /// If the backing storage cannot be read the failure is logged and the
    /// collection runs in memory only; this is not fatal.
    pub fn new(
        storage: Arc<dyn MirrorStorage>,
        clipboard: Arc<dyn Clipboard>,
        sink: Arc<dyn NotificationSink>,
        storage_key: &str,
    ) -> Self {
        let (store, mirror) = open_collection(&storage, storage_key);
        Self {
            storage,
            clipboard,
            sink,
            store: RwLock::new(store),
            mirror: Mutex::new(mirror),
            storage_key: RwLock::new(storage_key.to_string()),
            guard: TransportGuard::new(),
            hub: SelectionHub::new(),
        }
    }

    /// The active collection.
    pub fn collection(&self) -> Arc<NoteListCrdt> {
        Arc::clone(&self.store.read().unwrap())
    }

    /// The active storage key.
    pub fn storage_key(&self) -> String {
        self.storage_key.read().unwrap().clone()
    }

    /// Whether changes are currently being persisted.
    pub fn is_persisted(&self) -> bool {
        self.mirror.lock().unwrap().is_some()
    }

    /// Selection hub where map picks are published and awaited.
    pub fn selection(&self) -> &SelectionHub {
        &self.hub
    }

    /// Switch to the collection stored under another key.
    ///
    /// The old mirror is closed completely before the new one opens; two
    /// mirrors must never write to the same backing store. A no-op when
    /// the key is already active.
    pub fn set_storage_key(&self, key: &str) {
        if *self.storage_key.read().unwrap() == key {
            return;
        }

        if let Some(old) = self.mirror.lock().unwrap().take() {
            old.close();
        }

        let (store, mirror) = open_collection(&self.storage, key);
        *self.store.write().unwrap() = store;
        *self.mirror.lock().unwrap() = mirror;
        *self.storage_key.write().unwrap() = key.to_string();
        log::info!("[Planner] Switched to storage key '{}'", key);
    }

    /// Flush and stop persistence. The collection stays readable.
    pub fn close(&self) {
        if let Some(mirror) = self.mirror.lock().unwrap().take() {
            mirror.close();
        }
    }

    // ==================== Notes ====================

    /// Current contents of the collection, in order.
    pub fn notes(&self) -> Vec<Note> {
        self.collection().notes()
    }

    /// Look up a note by id.
    pub fn find_note(&self, id: &str) -> Option<Note> {
        self.collection().find_by_id(id)
    }

    /// A fresh note, not yet added, pre-scheduled on the next free day.
    pub fn create_note(&self) -> Note {
        let mut note = Note::new();
        note.date = DateRange::single(self.first_free_day());
        note
    }

    /// Append a note at the end of the collection.
    pub fn add_note(&self, note: &Note) -> Result<()> {
        self.collection().append(note)
    }

    /// Replace the note with matching id in place. `false` if absent.
    pub fn update_note(&self, id: &str, note: &Note) -> Result<bool> {
        self.collection().replace_by_id(id, note)
    }

    /// Remove the note with matching id. `false` if absent.
    pub fn delete_note(&self, id: &str) -> Result<bool> {
        self.collection().delete_by_id(id)
    }

    /// Attach a map location to a note, or detach it with `None`.
    ///
    /// This is where a point resolved by a selection wait lands. `false`
    /// if no note has this id.
    pub fn set_note_location(&self, id: &str, point: Option<GeoPoint>) -> Result<bool> {
        match self.find_note(id) {
            Some(mut note) => {
                note.location = point;
                self.update_note(id, &note)
            }
            None => Ok(false),
        }
    }

    /// Earliest day not covered by any note's date range.
    pub fn first_free_day(&self) -> CalendarDate {
        schedule::first_free_day(&self.notes())
    }

    /// Palette color for a note, derived from its current position.
    pub fn color_of(&self, id: &str) -> &'static NoteColor {
        palette::color_for(id, &self.notes())
    }

    // ==================== Transports ====================
    //
    // Each operation claims the in-flight slot first; a request made while
    // another transport runs is dropped silently.

    /// Export the collection to the clipboard.
    pub fn export_clipboard(&self) -> bool {
        let Some(_permit) = self.guard.try_acquire() else {
            log::debug!("[Planner] Transport busy, dropping clipboard export");
            return false;
        };
        export_to_clipboard(&self.collection(), self.clipboard.as_ref(), self.sink.as_ref())
    }

    /// Replace the collection with the clipboard's contents.
    pub fn import_clipboard(&self) -> bool {
        let Some(_permit) = self.guard.try_acquire() else {
            log::debug!("[Planner] Transport busy, dropping clipboard import");
            return false;
        };
        import_from_clipboard(&self.collection(), self.clipboard.as_ref(), self.sink.as_ref())
    }

    /// Export the collection to a remote log.
    pub fn export_remote(&self, log: &dyn RemoteLog) -> bool {
        let Some(_permit) = self.guard.try_acquire() else {
            log::debug!("[Planner] Transport busy, dropping remote export");
            return false;
        };
        export_to_remote_log(&self.collection(), log, self.sink.as_ref())
    }

    /// Replace the collection with the newest importable remote message.
    pub fn import_remote(&self, log: &dyn RemoteLog) -> bool {
        let Some(_permit) = self.guard.try_acquire() else {
            log::debug!("[Planner] Transport busy, dropping remote import");
            return false;
        };
        import_from_remote_log(&self.collection(), log, self.sink.as_ref())
    }
}

impl std::fmt::Debug for Planner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Planner")
            .field("storage_key", &self.storage_key())
            .field("note_count", &self.collection().len())
            .field("persisted", &self.is_persisted())
            .finish_non_exhaustive()
    }
}

/// Build a fresh collection and replay persisted state into it.
fn open_collection(
    storage: &Arc<dyn MirrorStorage>,
    key: &str,
) -> (Arc<NoteListCrdt>, Option<DurableMirror>) {
    let store = Arc::new(NoteListCrdt::new());
    match DurableMirror::attach(&store, Arc::clone(storage), key) {
        Ok(mirror) => (store, Some(mirror)),
        Err(e) => {
            log::error!(
                "[Planner] Could not open storage for '{}', continuing unpersisted: {}",
                key,
                e
            );
            (store, None)
        }
    }
}
