//! Conflict-free replicated storage for the note collection.
//!
//! The collection lives in a [`NoteListCrdt`], an ordered CRDT sequence
//! built on yrs. A [`DurableMirror`] replays persisted state into it on
//! startup and captures every committed transaction into a
//! [`MirrorStorage`] backend, either [`SqliteStorage`] on disk or
//! [`MemoryStorage`] for tests and ephemeral sessions.
//!
//! Replicas exchange binary update blobs (yrs v1 encoding). Applying the
//! same set of updates in any causally-valid order converges every replica
//! to the same note sequence.

mod memory_storage;
mod mirror;
mod note_list;
mod sqlite_storage;
mod storage;
mod types;

pub use memory_storage::MemoryStorage;
pub use mirror::{COMPACT_KEEP, COMPACT_THRESHOLD, DurableMirror};
pub use note_list::NoteListCrdt;
pub use sqlite_storage::SqliteStorage;
pub use storage::{MirrorStorage, StorageResult};
pub use types::{LoggedUpdate, UpdateOrigin};
