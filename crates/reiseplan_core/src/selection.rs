//! Selection coordination between a pending edit and the map.
//!
//! Attaching a location to a note works as a handshake: the pending edit
//! calls [`next_selection`] and waits, the map publishes the point the
//! user picks through the [`SelectionHub`], and the waiter resolves with
//! it. Waits are one-shot and cancellable; abandoning the edit cancels
//! its token, which rejects the wait and removes the listener so nothing
//! dangles.
//!
//! Publications are not queued. A publish with no active waiter only
//! updates the current selection; a waiter that subscribes afterwards sees
//! the next publication, not the missed one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::{ReiseplanError, Result};
use crate::model::GeoPoint;

/// A unique identifier for a selection listener.
pub type ListenerId = u64;

/// Callback invoked with each published map point.
pub type SelectionCallback = Arc<dyn Fn(GeoPoint) + Send + Sync>;

/// Thread-safe fan-out point for map selection events.
pub struct SelectionHub {
    /// Map of listener IDs to callbacks.
    listeners: RwLock<HashMap<ListenerId, SelectionCallback>>,
    /// The most recently published point.
    current: RwLock<Option<GeoPoint>>,
    /// Counter for generating unique listener IDs.
    next_id: AtomicU64,
}

impl SelectionHub {
    /// Create a hub with no listeners and no current selection.
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            current: RwLock::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener for future selection events.
    ///
    /// Returns a listener ID that can be used to unsubscribe later.
    pub fn subscribe(&self, callback: SelectionCallback) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut listeners = self.listeners.write().unwrap();
        listeners.insert(id, callback);
        id
    }

    /// Remove a listener. Returns `true` if it was registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap();
        listeners.remove(&id).is_some()
    }

    /// Publish a picked point to all listeners.
    ///
    /// Callbacks are invoked synchronously in an undefined order. A
    /// panicking callback does not affect the others.
    pub fn publish(&self, point: GeoPoint) {
        *self.current.write().unwrap() = Some(point);

        let listeners = self.listeners.read().unwrap();
        for callback in listeners.values() {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                callback(point);
            }));
        }
    }

    /// Forget the current selection. Listeners are not notified.
    pub fn clear(&self) {
        *self.current.write().unwrap() = None;
    }

    /// The most recently published point, if any.
    pub fn current(&self) -> Option<GeoPoint> {
        *self.current.read().unwrap()
    }

    /// Number of active listeners.
    pub fn listener_count(&self) -> usize {
        let listeners = self.listeners.read().unwrap();
        listeners.len()
    }
}

impl Default for SelectionHub {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SelectionHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.read().unwrap();
        f.debug_struct("SelectionHub")
            .field("listener_count", &listeners.len())
            .field("current", &self.current.read().unwrap())
            .finish()
    }
}

/// Removes the listener when the wait ends, resolved or not.
struct UnsubscribeGuard<'a> {
    hub: &'a SelectionHub,
    id: ListenerId,
}

impl Drop for UnsubscribeGuard<'_> {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
    }
}

/// Wait for the next published map point.
///
/// Resolves with the next point published after the call. Cancelling the
/// token rejects the wait with [`ReiseplanError::SelectionCancelled`]. The
/// listener is removed on every exit path.
pub async fn next_selection(hub: &SelectionHub, cancel: &CancellationToken) -> Result<GeoPoint> {
    let (tx, rx) = oneshot::channel();
    let slot = Mutex::new(Some(tx));
    let id = hub.subscribe(Arc::new(move |point| {
        // One-shot: later publications go to later waiters
        if let Some(tx) = slot.lock().unwrap().take() {
            let _ = tx.send(point);
        }
    }));
    let _guard = UnsubscribeGuard { hub, id };

    tokio::select! {
        _ = cancel.cancelled() => Err(ReiseplanError::SelectionCancelled),
        selected = rx => selected.map_err(|_| ReiseplanError::SelectionCancelled),
    }
}

/// Blocking wrapper around [`next_selection`] for sync contexts (CLI).
pub fn next_selection_blocking(hub: &SelectionHub, cancel: &CancellationToken) -> Result<GeoPoint> {
    futures_lite::future::block_on(next_selection(hub, cancel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn point(lat: f64) -> GeoPoint {
        GeoPoint::new(lat, 0.0)
    }

    #[test]
    fn test_current_selection_tracking() {
        let hub = SelectionHub::new();
        assert!(hub.current().is_none());

        hub.publish(point(1.0));
        assert_eq!(hub.current(), Some(point(1.0)));
        hub.publish(point(2.0));
        assert_eq!(hub.current(), Some(point(2.0)));

        hub.clear();
        assert!(hub.current().is_none());
    }

    #[test]
    fn test_subscribe_and_publish() {
        let hub = SelectionHub::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let counter_clone = Arc::clone(&counter);
        let _id = hub.subscribe(Arc::new(move |_point| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        }));

        hub.publish(point(1.0));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribed_listener_is_not_called() {
        let hub = SelectionHub::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let counter_clone = Arc::clone(&counter);
        let id = hub.subscribe(Arc::new(move |_point| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(hub.unsubscribe(id));
        assert!(!hub.unsubscribe(id));

        hub.publish(point(1.0));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_panicking_listener_does_not_break_others() {
        let hub = SelectionHub::new();
        let counter = Arc::new(AtomicUsize::new(0));

        hub.subscribe(Arc::new(|_| {
            panic!("bad listener");
        }));
        let counter_clone = Arc::clone(&counter);
        hub.subscribe(Arc::new(move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        }));

        hub.publish(point(1.0));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_waiter_resolves_on_publish() {
        let hub = Arc::new(SelectionHub::new());
        let cancel = CancellationToken::new();

        let waiter_hub = Arc::clone(&hub);
        let token = cancel.clone();
        let waiter = std::thread::spawn(move || next_selection_blocking(&waiter_hub, &token));

        while hub.listener_count() == 0 {
            std::thread::yield_now();
        }
        hub.publish(GeoPoint::new(38.72, -9.14));

        assert_eq!(waiter.join().unwrap().unwrap(), GeoPoint::new(38.72, -9.14));
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn test_cancel_rejects_waiter_and_removes_listener() {
        let hub = Arc::new(SelectionHub::new());
        let cancel = CancellationToken::new();

        let waiter_hub = Arc::clone(&hub);
        let token = cancel.clone();
        let waiter = std::thread::spawn(move || next_selection_blocking(&waiter_hub, &token));

        while hub.listener_count() == 0 {
            std::thread::yield_now();
        }
        cancel.cancel();

        let result = waiter.join().unwrap();
        assert!(matches!(result, Err(ReiseplanError::SelectionCancelled)));
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn test_already_cancelled_token_rejects_immediately() {
        let hub = SelectionHub::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = next_selection_blocking(&hub, &cancel);
        assert!(matches!(result, Err(ReiseplanError::SelectionCancelled)));
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn test_late_publication_resolves_nothing() {
        let hub = SelectionHub::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(next_selection_blocking(&hub, &cancel).is_err());

        // The cancelled wait left no listener behind; this publish goes nowhere
        hub.publish(point(1.0));
        assert_eq!(hub.listener_count(), 0);
        assert_eq!(hub.current(), Some(point(1.0)));
    }

    #[test]
    fn test_earlier_publication_is_not_queued() {
        let hub = Arc::new(SelectionHub::new());
        hub.publish(point(1.0));

        let cancel = CancellationToken::new();
        let waiter_hub = Arc::clone(&hub);
        let token = cancel.clone();
        let waiter = std::thread::spawn(move || next_selection_blocking(&waiter_hub, &token));

        while hub.listener_count() == 0 {
            std::thread::yield_now();
        }
        hub.publish(point(2.0));

        // The waiter sees only the publication made while it was waiting
        assert_eq!(waiter.join().unwrap().unwrap(), point(2.0));
    }

    #[test]
    fn test_concurrent_waiters_share_one_event() {
        let hub = Arc::new(SelectionHub::new());
        let cancel = CancellationToken::new();

        let waiters: Vec<_> = (0..2)
            .map(|_| {
                let hub = Arc::clone(&hub);
                let token = cancel.clone();
                std::thread::spawn(move || next_selection_blocking(&hub, &token))
            })
            .collect();

        while hub.listener_count() < 2 {
            std::thread::yield_now();
        }
        hub.publish(point(3.0));

        for waiter in waiters {
            assert_eq!(waiter.join().unwrap().unwrap(), point(3.0));
        }
        assert_eq!(hub.listener_count(), 0);
    }
}
