//! Signal/slot system for Lattice Grid.
//!
//! Every model the grid talks to reports its changes through a
//! [`Signal<Args>`]. Connecting returns a [`ConnectionId`];
//! [`Signal::connect_guarded`] instead returns a [`ConnectionGuard`] that
//! disconnects on drop, which is how the grid detaches from a model it no
//! longer uses.
//!
//! # Re-entrancy
//!
//! All slots are invoked directly on the emitting thread. The connection
//! table is snapshotted before any slot runs, so a slot may connect,
//! disconnect, or emit on the same signal without deadlocking. Connections
//! added during an emission are not invoked by that emission.
//!
//! # Example
//!
//! ```
//! use lattice_grid_core::Signal;
//!
//! let current_changed = Signal::<Option<usize>>::new();
//! let id = current_changed.connect(|row| {
//!     println!("current row is now {row:?}");
//! });
//!
//! current_changed.emit(Some(4));
//! assert!(current_changed.disconnect(id));
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

use crate::logging::targets;

new_key_type! {
    /// Handle for one connection, passed to [`Signal::disconnect`].
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A list of callbacks invoked with `&Args` on every [`emit`](Self::emit).
///
/// Slots run on whichever thread emits, in connection order.
pub struct Signal<Args> {
    connections: Mutex<SlotMap<ConnectionId, Slot<Args>>>,
    blocked: AtomicBool,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("connections", &self.connection_count())
            .field("blocked", &self.is_blocked())
            .finish()
    }
}

impl<Args: 'static> Signal<Args> {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(SlotMap::with_key()),
            blocked: AtomicBool::new(false),
        }
    }

    /// Register `slot`; it stays connected until [`disconnect`](Self::disconnect).
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.connections.lock().insert(Arc::new(slot))
    }

    /// `false` when `id` was already disconnected.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// While blocked, [`emit`](Self::emit) is a no-op.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Emit the signal, invoking all connected slots in connection order.
    ///
    /// If the signal is blocked, this does nothing.
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "signal blocked, skipping emit");
            return;
        }

        // Release the lock before invoking so slots may re-enter this signal.
        let slots: Vec<Slot<Args>> = self.connections.lock().values().cloned().collect();
        tracing::trace!(target: targets::SIGNAL, connection_count = slots.len(), "emitting signal");

        for slot in slots {
            slot(&args);
        }
    }
}

impl<Args: Send + 'static> Signal<Args> {
    /// Connect a slot to a signal owned by a shared object and return a guard
    /// that disconnects it when dropped.
    ///
    /// The guard keeps `owner` alive, so the signal always outlives the
    /// connection. `signal` selects the signal field on the owner.
    ///
    /// # Example
    ///
    /// ```
    /// use lattice_grid_core::Signal;
    /// use std::sync::atomic::{AtomicI32, Ordering};
    /// use std::sync::Arc;
    ///
    /// struct Counter { changed: Signal<i32> }
    ///
    /// let owner = Arc::new(Counter { changed: Signal::new() });
    /// let total = Arc::new(AtomicI32::new(0));
    /// {
    ///     let total = total.clone();
    ///     let _guard = Signal::connect_guarded(&owner, |c: &Counter| &c.changed, move |&n| {
    ///         total.fetch_add(n, Ordering::SeqCst);
    ///     });
    ///     owner.changed.emit(42);
    /// }
    /// owner.changed.emit(43); // connection was dropped
    /// assert_eq!(total.load(Ordering::SeqCst), 42);
    /// ```
    pub fn connect_guarded<O, F>(
        owner: &Arc<O>,
        signal: fn(&O) -> &Signal<Args>,
        slot: F,
    ) -> ConnectionGuard
    where
        O: ?Sized + Send + Sync + 'static,
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = signal(owner).connect(slot);
        let owner = Arc::clone(owner);
        ConnectionGuard::new(move || {
            signal(&owner).disconnect(id);
        })
    }
}

static_assertions::assert_impl_all!(Signal<i32>: Send, Sync);

/// A connection guard that disconnects its slot when dropped.
///
/// Created via [`Signal::connect_guarded`]. Guards are what a consumer holds
/// while attached to a model; dropping them detaches cleanly on model swap.
#[must_use = "dropping the guard disconnects the slot immediately"]
pub struct ConnectionGuard {
    disconnect: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl ConnectionGuard {
    /// Create a guard that runs `disconnect` on drop.
    pub fn new<F>(disconnect: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            disconnect: Some(Box::new(disconnect)),
        }
    }

    /// Keep the connection alive forever and discard the guard.
    pub fn forget(mut self) {
        self.disconnect = None;
    }
}

impl fmt::Debug for ConnectionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionGuard")
            .field("armed", &self.disconnect.is_some())
            .finish()
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if let Some(disconnect) = self.disconnect.take() {
            disconnect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_signal_delivers_in_connection_order() {
        let rows_changed = Signal::<usize>::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for name in ["grid", "binding"] {
            let log = Arc::clone(&log);
            rows_changed.connect(move |&rows| log.lock().push((name, rows)));
        }
        rows_changed.emit(3);

        assert_eq!(*log.lock(), vec![("grid", 3), ("binding", 3)]);
    }

    #[test]
    fn test_signal_disconnect() {
        let signal = Signal::<Option<usize>>::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let sink = Arc::clone(&hits);
        let id = signal.connect(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        });

        signal.emit(Some(1));
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit(None);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_signal_blocked() {
        let signal = Signal::<()>::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let sink = Arc::clone(&hits);
        signal.connect(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        });

        signal.set_blocked(true);
        signal.emit(());
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        signal.set_blocked(false);
        assert!(!signal.is_blocked());
        signal.emit(());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reentrant_emit_does_not_deadlock() {
        let signal = Arc::new(Signal::<u32>::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let inner = signal.clone();
        let seen_clone = seen.clone();
        signal.connect(move |&depth| {
            seen_clone.lock().push(depth);
            if depth < 2 {
                inner.emit(depth + 1);
            }
        });

        signal.emit(0);
        assert_eq!(*seen.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_connect_during_emit_is_deferred() {
        let signal = Arc::new(Signal::<()>::new());
        let hits = Arc::new(AtomicUsize::new(0));

        let inner = signal.clone();
        let sink = Arc::clone(&hits);
        signal.connect(move |_| {
            let sink = Arc::clone(&sink);
            inner.connect(move |_| {
                sink.fetch_add(1, Ordering::SeqCst);
            });
        });

        signal.emit(());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(signal.connection_count(), 2);
    }

    #[test]
    fn test_connection_guard() {
        struct Owner {
            changed: Signal<i32>,
        }

        let owner = Arc::new(Owner {
            changed: Signal::new(),
        });
        let hits = Arc::new(AtomicUsize::new(0));

        {
            let sink = Arc::clone(&hits);
            let _guard = Signal::connect_guarded(&owner, |o: &Owner| &o.changed, move |_| {
                sink.fetch_add(1, Ordering::SeqCst);
            });
            owner.changed.emit(1);
            assert_eq!(owner.changed.connection_count(), 1);
        }

        owner.changed.emit(2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(owner.changed.connection_count(), 0);
    }

    #[test]
    fn test_connection_guard_forget() {
        struct Owner {
            changed: Signal<()>,
        }

        let owner = Arc::new(Owner {
            changed: Signal::new(),
        });
        let guard = Signal::connect_guarded(&owner, |o: &Owner| &o.changed, |_| {});
        guard.forget();
        assert_eq!(owner.changed.connection_count(), 1);
    }
}
