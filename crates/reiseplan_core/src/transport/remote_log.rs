//! Remote ordered-log transport.
//!
//! A [`RemoteLog`] is an append-only message log shared between replicas.
//! Export appends the collection as one JSON message; import scans a small
//! window of the newest messages and replaces the collection with the first
//! one that parses. The log itself knows nothing about the collection's
//! causal history, so this exchange is last-writer-wins-by-fetch.

use std::sync::Mutex;

use crate::crdt::NoteListCrdt;
use crate::error::Result;
use crate::model::Note;
use crate::notify::{NotificationSink, Toast};

/// How many of the newest messages an import scans.
pub const REMOTE_SCAN_LIMIT: usize = 5;

/// An external append-only message log.
pub trait RemoteLog: Send + Sync {
    /// Human-readable medium name, used in outcome notifications.
    fn display_name(&self) -> &str;

    /// Subscribe to the log. Called before reading; failing because the
    /// replica is already subscribed is expected.
    fn join(&self) -> Result<()>;

    /// Append a message body to the log.
    fn append(&self, body: &str) -> Result<()>;

    /// Bodies of the newest messages, newest first, up to `limit`.
    fn recent(&self, limit: usize) -> Result<Vec<String>>;
}

/// In-process log for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryLog {
    messages: Mutex<Vec<String>>,
}

impl MemoryLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RemoteLog for MemoryLog {
    fn display_name(&self) -> &str {
        "the memory log"
    }

    fn join(&self) -> Result<()> {
        Ok(())
    }

    fn append(&self, body: &str) -> Result<()> {
        self.messages.lock().unwrap().push(body.to_string());
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<String>> {
        let messages = self.messages.lock().unwrap();
        Ok(messages.iter().rev().take(limit).cloned().collect())
    }
}

/// Append the resolved collection to the log as one JSON message.
///
/// Reports the outcome through `sink` and returns whether it succeeded.
pub fn export_to_remote_log(
    store: &NoteListCrdt,
    log: &dyn RemoteLog,
    sink: &dyn NotificationSink,
) -> bool {
    let json = match serde_json::to_string(&store.notes()) {
        Ok(json) => json,
        Err(e) => {
            sink.notify(export_failed(log, &e));
            return false;
        }
    };

    match log.append(&json) {
        Ok(()) => {
            sink.notify(Toast::success(
                "Export successful",
                format!("Notes exported to {}.", log.display_name()),
            ));
            true
        }
        Err(e) => {
            sink.notify(export_failed(log, &e));
            false
        }
    }
}

/// Replace the collection with the newest parseable message in the log.
///
/// Joins the log first; a join failure (typically: already a member) is
/// swallowed. Scans up to [`REMOTE_SCAN_LIMIT`] of the newest messages,
/// newest first, and takes the first whose body parses as a note
/// collection. Messages that do not parse are skipped. If nothing in the
/// window parses, the collection is left untouched and the import reports
/// failure.
pub fn import_from_remote_log(
    store: &NoteListCrdt,
    log: &dyn RemoteLog,
    sink: &dyn NotificationSink,
) -> bool {
    if let Err(e) = log.join() {
        log::debug!(
            "[Transport] Ignoring join failure for {} (possibly already a member): {}",
            log.display_name(),
            e
        );
    }

    let bodies = match log.recent(REMOTE_SCAN_LIMIT) {
        Ok(bodies) => bodies,
        Err(e) => {
            sink.notify(import_failed(log, &e));
            return false;
        }
    };

    for body in &bodies {
        let Ok(notes) = serde_json::from_str::<Vec<Note>>(body) else {
            continue;
        };
        return match store.clear_and_bulk_insert(&notes) {
            Ok(()) => {
                sink.notify(Toast::success(
                    "Import successful",
                    format!("Notes imported from {}.", log.display_name()),
                ));
                true
            }
            Err(e) => {
                sink.notify(import_failed(log, &e));
                false
            }
        };
    }

    sink.notify(import_failed(log, &"no importable notes found"));
    false
}

fn export_failed(log: &dyn RemoteLog, cause: &dyn std::fmt::Display) -> Toast {
    Toast::error(
        "Export failed",
        format!(
            "Notes couldn't be exported to {}. ({})",
            log.display_name(),
            cause
        ),
    )
}

fn import_failed(log: &dyn RemoteLog, cause: &dyn std::fmt::Display) -> Toast {
    Toast::error(
        "Import failed",
        format!(
            "Notes couldn't be imported from {}. ({})",
            log.display_name(),
            cause
        ),
    )
}
