//! Re-entrancy guards.
//!
//! Two primitives keep mutually-synchronized state from echoing changes back
//! and forth:
//!
//! - [`SyncFlag`] marks that a push in one direction is in progress. Handlers
//!   for the opposite direction check the flag and skip. Acquisition returns a
//!   [`SyncGuard`] that restores the previous state on every exit path,
//!   including early returns and unwinding.
//! - [`DeferCounter`] counts nested operations so that outward notifications
//!   fire once, when the outermost operation completes.
//!
//! Both are cheap to clone and share the same underlying state, so a clone can
//! be captured by a `Send + Sync` signal slot.
//!
//! # Example
//!
//! ```
//! use lattice_grid_core::sync::SyncFlag;
//!
//! let syncing = SyncFlag::new("selection_model");
//! {
//!     let _guard = syncing.try_enter().expect("idle");
//!     assert!(syncing.is_set());
//!     // Nested attempts are rejected while the push is in progress.
//!     assert!(syncing.try_enter().is_none());
//! }
//! assert!(!syncing.is_set());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::logging::targets;

/// A named boolean re-entrancy flag with scoped acquisition.
#[derive(Clone)]
pub struct SyncFlag {
    name: &'static str,
    state: Arc<AtomicBool>,
}

impl SyncFlag {
    /// Create a cleared flag. The name is only used for tracing.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the flag's name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns whether a push guarded by this flag is in progress.
    pub fn is_set(&self) -> bool {
        self.state.load(Ordering::SeqCst)
    }

    /// Acquire the flag if it is clear.
    ///
    /// Returns `None` when the flag is already set; callers treat that as a
    /// re-entrant call and return without doing anything.
    pub fn try_enter(&self) -> Option<SyncGuard> {
        if self.state.swap(true, Ordering::SeqCst) {
            tracing::trace!(target: targets::SYNC, flag = self.name, "re-entrant sync skipped");
            return None;
        }
        Some(SyncGuard {
            state: Arc::clone(&self.state),
            previous: false,
        })
    }

    /// Set the flag regardless of its current state.
    ///
    /// The guard restores whatever value the flag had before.
    pub fn enter(&self) -> SyncGuard {
        let previous = self.state.swap(true, Ordering::SeqCst);
        SyncGuard {
            state: Arc::clone(&self.state),
            previous,
        }
    }
}

impl fmt::Debug for SyncFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncFlag")
            .field("name", &self.name)
            .field("set", &self.is_set())
            .finish()
    }
}

/// Restores a [`SyncFlag`] to its previous value when dropped.
#[must_use = "the flag is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct SyncGuard {
    state: Arc<AtomicBool>,
    previous: bool,
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        self.state.store(self.previous, Ordering::SeqCst);
    }
}

/// A nesting counter for deferring notifications to the outermost caller.
#[derive(Clone)]
pub struct DeferCounter {
    name: &'static str,
    depth: Arc<AtomicUsize>,
}

impl DeferCounter {
    /// Create a counter at depth zero.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            depth: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    /// Returns `true` when no operation is in progress.
    pub fn is_idle(&self) -> bool {
        self.depth() == 0
    }

    /// Enter one nesting level.
    pub fn enter(&self) -> DeferGuard {
        self.depth.fetch_add(1, Ordering::SeqCst);
        DeferGuard {
            depth: Some(Arc::clone(&self.depth)),
        }
    }
}

impl fmt::Debug for DeferCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferCounter")
            .field("name", &self.name)
            .field("depth", &self.depth())
            .finish()
    }
}

/// One nesting level of a [`DeferCounter`].
#[must_use = "the nesting level is left as soon as the guard is dropped"]
#[derive(Debug)]
pub struct DeferGuard {
    depth: Option<Arc<AtomicUsize>>,
}

impl DeferGuard {
    /// Leave the nesting level explicitly.
    ///
    /// Returns `true` if this was the outermost level, meaning deferred
    /// notifications should be flushed now.
    pub fn release(mut self) -> bool {
        match self.depth.take() {
            Some(depth) => depth.fetch_sub(1, Ordering::SeqCst) == 1,
            None => false,
        }
    }
}

impl Drop for DeferGuard {
    fn drop(&mut self) {
        if let Some(depth) = self.depth.take() {
            depth.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

static_assertions::assert_impl_all!(SyncFlag: Send, Sync);
static_assertions::assert_impl_all!(DeferCounter: Send, Sync);
