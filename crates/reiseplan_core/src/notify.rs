//! User-facing outcome reporting.
//!
//! Transport operations report their outcome as [`Toast`] values through a
//! [`NotificationSink`]. The core never renders anything itself; embedders
//! decide what a toast looks like. [`LogSink`] routes toasts to the log for
//! headless use, [`RecordingSink`] captures them for assertions.

use std::sync::Mutex;

/// How a toast should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The operation completed.
    Success,
    /// The operation failed.
    Error,
}

/// A transient user notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    /// Short heading, e.g. "Import successful"
    pub title: String,
    /// One sentence of detail, including the cause on failure
    pub description: String,
    /// Success or error presentation
    pub severity: Severity,
}

impl Toast {
    /// A success toast.
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Success,
        }
    }

    /// An error toast.
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Error,
        }
    }
}

/// Receiver for transport outcome notifications.
pub trait NotificationSink: Send + Sync {
    /// Present `toast` to the user.
    fn notify(&self, toast: Toast);
}

/// Sink that writes toasts to the log.
#[derive(Debug, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, toast: Toast) {
        match toast.severity {
            Severity::Success => log::info!("[Notify] {}: {}", toast.title, toast.description),
            Severity::Error => log::error!("[Notify] {}: {}", toast.title, toast.description),
        }
    }
}

/// Sink that records toasts for later inspection.
#[derive(Debug, Default)]
pub struct RecordingSink {
    toasts: Mutex<Vec<Toast>>,
}

impl RecordingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All toasts received so far, in order.
    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, toast: Toast) {
        self.toasts.lock().unwrap().push(toast);
    }
}
