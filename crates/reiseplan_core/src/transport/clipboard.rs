//! Clipboard transport.
//!
//! The clipboard carries the collection as a UTF-8 JSON array of notes.
//! Where the clipboard lives is up to the embedder; [`MemoryClipboard`]
//! backs tests and headless use.

use std::sync::Mutex;

use crate::crdt::NoteListCrdt;
use crate::error::Result;
use crate::model::Note;
use crate::notify::{NotificationSink, Toast};

/// Access to a text clipboard.
pub trait Clipboard: Send + Sync {
    /// Replace the clipboard contents with `text`.
    fn write_text(&self, text: &str) -> Result<()>;

    /// The current clipboard contents.
    fn read_text(&self) -> Result<String>;
}

/// In-process clipboard, empty until first written.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    content: Mutex<String>,
}

impl MemoryClipboard {
    /// Create an empty clipboard.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<()> {
        *self.content.lock().unwrap() = text.to_string();
        Ok(())
    }

    fn read_text(&self) -> Result<String> {
        Ok(self.content.lock().unwrap().clone())
    }
}

/// Write the resolved collection to the clipboard as JSON.
///
/// Reports the outcome through `sink` and returns whether it succeeded.
pub fn export_to_clipboard(
    store: &NoteListCrdt,
    clipboard: &dyn Clipboard,
    sink: &dyn NotificationSink,
) -> bool {
    let json = match serde_json::to_string(&store.notes()) {
        Ok(json) => json,
        Err(e) => {
            sink.notify(Toast::error(
                "Export failed",
                format!("Notes couldn't be exported to the clipboard. ({})", e),
            ));
            return false;
        }
    };

    match clipboard.write_text(&json) {
        Ok(()) => {
            sink.notify(Toast::success(
                "Export successful",
                "Notes exported to the clipboard.",
            ));
            true
        }
        Err(e) => {
            sink.notify(Toast::error(
                "Export failed",
                format!("Notes couldn't be exported to the clipboard. ({})", e),
            ));
            false
        }
    }
}

/// Replace the collection with the clipboard's contents.
///
/// The clipboard text must parse as a JSON array of notes; anything in the
/// local collection not present in it is lost. On any failure the
/// collection is left untouched.
pub fn import_from_clipboard(
    store: &NoteListCrdt,
    clipboard: &dyn Clipboard,
    sink: &dyn NotificationSink,
) -> bool {
    let text = match clipboard.read_text() {
        Ok(text) => text,
        Err(e) => {
            sink.notify(Toast::error(
                "Import failed",
                format!("Notes couldn't be imported from the clipboard. ({})", e),
            ));
            return false;
        }
    };

    match serde_json::from_str::<Vec<Note>>(&text) {
        Ok(notes) => match store.clear_and_bulk_insert(&notes) {
            Ok(()) => {
                sink.notify(Toast::success(
                    "Import successful",
                    "Notes imported from the clipboard.",
                ));
                true
            }
            Err(e) => {
                sink.notify(Toast::error(
                    "Import failed",
                    format!("Notes couldn't be imported from the clipboard. ({})", e),
                ));
                false
            }
        },
        Err(e) => {
            sink.notify(Toast::error(
                "Import failed",
                format!("Notes couldn't be imported from the clipboard. ({})", e),
            ));
            false
        }
    }
}
