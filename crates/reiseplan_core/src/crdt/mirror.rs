//! Durable mirror of the note collection.
//!
//! A [`DurableMirror`] keeps a [`NoteListCrdt`](super::NoteListCrdt) and a
//! [`MirrorStorage`] backend in agreement:
//!
//! 1. On attach it replays the stored snapshot and logged updates into the
//!    collection, bringing it back to its last committed state.
//! 2. Only then does it subscribe, so replayed updates are never recorded
//!    a second time.
//! 3. From that point every committed transaction is handed to a background
//!    writer thread which appends it to the update log. Mutations never
//!    block on storage.
//!
//! When the log grows past [`COMPACT_THRESHOLD`] rows the writer folds it
//! into a fresh snapshot, keeping [`COMPACT_KEEP`] tail rows. Closing the
//! mirror (or dropping it) drains the queue before the writer stops, so no
//! committed update is lost on an orderly shutdown.
//!
//! All storage access is scoped by a storage key; collections under
//! different keys never mix.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::JoinHandle;

use super::note_list::NoteListCrdt;
use super::storage::MirrorStorage;
use super::types::UpdateOrigin;
use crate::error::Result;

/// Log length at which the writer folds the log into a snapshot.
pub const COMPACT_THRESHOLD: usize = 500;

/// Tail rows the writer keeps when compacting.
pub const COMPACT_KEEP: usize = 1;

/// A committed update on its way to the log.
struct CapturedUpdate {
    data: Vec<u8>,
    origin: UpdateOrigin,
}

/// Connects a note collection to persistent storage.
///
/// Holds the update subscription and the writer thread. Dropping the mirror
/// tears both down in order: unsubscribe, drain the queue, join the writer.
pub struct DurableMirror {
    /// Key scoping all storage access for this mirror
    storage_key: String,

    /// Update subscription; dropped first on teardown
    subscription: Option<yrs::Subscription>,

    /// Producer side of the writer queue; dropping it lets the writer drain
    sender: Option<Sender<CapturedUpdate>>,

    /// Background writer, joined on teardown
    writer: Option<JoinHandle<()>>,
}

impl DurableMirror {
    /// Replay persisted state into `store`, then start capturing its updates.
    ///
    /// Corrupt rows are skipped with a warning rather than failing the whole
    /// replay.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read or the writer thread
    /// cannot be spawned. The collection stays usable either way; it just
    /// runs unpersisted.
    pub fn attach(
        store: &NoteListCrdt,
        storage: Arc<dyn MirrorStorage>,
        storage_key: &str,
    ) -> Result<Self> {
        let snapshot = storage.load_snapshot(storage_key)?;
        let logged = storage.all_updates(storage_key)?;

        if let Some(state) = &snapshot
            && let Err(e) = store.apply_update(state)
        {
            log::warn!("[Mirror] Skipping corrupt snapshot for '{}': {}", storage_key, e);
        }
        for row in &logged {
            if let Err(e) = store.apply_update(&row.data) {
                log::warn!(
                    "[Mirror] Skipping corrupt update {} for '{}': {}",
                    row.update_id,
                    storage_key,
                    e
                );
            }
        }
        log::info!(
            "[Mirror] Attached '{}': replayed {} logged updates (snapshot: {})",
            storage_key,
            logged.len(),
            snapshot.is_some()
        );

        let (sender, receiver) = channel();
        let writer = spawn_writer(
            Arc::clone(&storage),
            storage_key.to_string(),
            receiver,
            logged.len(),
        )?;

        // Subscribe only after replay so replayed updates are not re-captured
        let capture = sender.clone();
        let subscription = store.observe_updates(move |update, origin| {
            let _ = capture.send(CapturedUpdate {
                data: update.to_vec(),
                origin,
            });
        });

        Ok(Self {
            storage_key: storage_key.to_string(),
            subscription: Some(subscription),
            sender: Some(sender),
            writer: Some(writer),
        })
    }

    /// The storage key this mirror writes under.
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Stop capturing, flush queued updates to storage and join the writer.
    pub fn close(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        // Order matters: stop producing, then let the writer drain and exit
        self.subscription.take();
        self.sender.take();
        if let Some(handle) = self.writer.take()
            && handle.join().is_err()
        {
            log::error!("[Mirror] Writer thread for '{}' panicked", self.storage_key);
        }
    }
}

impl Drop for DurableMirror {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for DurableMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableMirror")
            .field("storage_key", &self.storage_key)
            .finish_non_exhaustive()
    }
}

/// Start the background writer.
///
/// The writer appends each captured update and compacts the log when it
/// reaches [`COMPACT_THRESHOLD`] rows. `seed_rows` is the log length at
/// attach time so compaction counts restart-surviving rows too.
fn spawn_writer(
    storage: Arc<dyn MirrorStorage>,
    storage_key: String,
    receiver: Receiver<CapturedUpdate>,
    seed_rows: usize,
) -> Result<JoinHandle<()>> {
    let handle = std::thread::Builder::new()
        .name("mirror-writer".to_string())
        .spawn(move || {
            let mut rows = seed_rows;
            while let Ok(captured) = receiver.recv() {
                match storage.append_update(&storage_key, &captured.data, captured.origin) {
                    Ok(_) => rows += 1,
                    Err(e) => {
                        log::error!("[Mirror] Failed to persist update for '{}': {}", storage_key, e);
                        continue;
                    }
                }

                if rows >= COMPACT_THRESHOLD {
                    match storage.compact(&storage_key, COMPACT_KEEP) {
                        Ok(()) => {
                            log::info!(
                                "[Mirror] Compacted '{}' ({} rows folded into snapshot)",
                                storage_key,
                                rows
                            );
                            rows = COMPACT_KEEP;
                        }
                        Err(e) => {
                            log::warn!("[Mirror] Compaction failed for '{}': {}", storage_key, e)
                        }
                    }
                }
            }
        })?;
    Ok(handle)
}
