//! Transport channels for manual replica synchronization.
//!
//! Transports move the entire resolved collection across media that know
//! nothing about its causal history: a clipboard-sized JSON blob, or a
//! message appended to a remote ordered log. Export serializes the current
//! view; import parses a blob and replaces the local collection wholesale
//! via `clear_and_bulk_insert`. Import is deliberately destructive, a
//! last-writer-wins-by-fetch exchange rather than a merge; entries absent
//! from the imported blob are lost.
//!
//! Every operation reports its outcome through a
//! [`NotificationSink`](crate::notify::NotificationSink) and returns a
//! plain success flag. A [`TransportGuard`] serializes operations to one
//! in flight at a time; a rejected request is a silent no-op, not an
//! error.

mod clipboard;
mod matrix;
mod remote_log;

pub use clipboard::{Clipboard, MemoryClipboard, export_to_clipboard, import_from_clipboard};
pub use matrix::{MatrixLog, Session, login_to_matrix};
pub use remote_log::{
    MemoryLog, REMOTE_SCAN_LIMIT, RemoteLog, export_to_remote_log, import_from_remote_log,
};

use std::sync::atomic::{AtomicBool, Ordering};

/// Admits at most one transport operation at a time.
///
/// Acquiring while an operation holds the permit fails without blocking.
/// The permit releases the guard when dropped, on every exit path.
#[derive(Debug, Default)]
pub struct TransportGuard {
    busy: AtomicBool,
}

impl TransportGuard {
    /// Create an idle guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to claim the in-flight slot. `None` means another operation is
    /// already running.
    pub fn try_acquire(&self) -> Option<TransportPermit<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(TransportPermit { guard: self })
        } else {
            None
        }
    }

    /// Whether an operation currently holds the permit.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Relaxed)
    }
}

/// Exclusive right to run one transport operation.
pub struct TransportPermit<'a> {
    guard: &'a TransportGuard,
}

impl Drop for TransportPermit<'_> {
    fn drop(&mut self) {
        self.guard.busy.store(false, Ordering::Release);
    }
}
