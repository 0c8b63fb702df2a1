//! Core primitives for Lattice Grid.
//!
//! This crate provides the building blocks the data grid is assembled from:
//!
//! - **Signal/Slot System**: Type-safe observer registration with RAII guards
//! - **Property System**: Change-detecting value cells with silent rollback
//! - **Observable Lists**: Shared lists emitting collection-change deltas
//! - **Re-entrancy Guards**: Scoped sync flags and nesting counters
//! - **Task Queue**: Deferred, coalescible low-priority work
//!
//! # Signal/Slot Example
//!
//! ```
//! use lattice_grid_core::Signal;
//!
//! let value_changed = Signal::<i32>::new();
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//! value_changed.emit(42);
//! value_changed.disconnect(conn_id);
//! ```
//!
//! # Observable List Example
//!
//! ```
//! use lattice_grid_core::{CollectionChange, ObservableList};
//!
//! let list = ObservableList::<String>::new();
//! list.collection_changed.connect(|change| {
//!     if let CollectionChange::Add { index, .. } = change {
//!         println!("added at {}", index);
//!     }
//! });
//! list.push("row 1".to_string());
//! ```

mod error;
pub mod logging;
pub mod observable;
pub mod property;
pub mod signal;
pub mod sync;
pub mod task;

pub use error::{CoreError, Result};
pub use observable::{CollectionChange, ObservableList};
pub use property::Property;
pub use signal::{ConnectionGuard, ConnectionId, Signal};
pub use sync::{DeferCounter, DeferGuard, SyncFlag, SyncGuard};
pub use task::{CoalescingToken, TaskBatch, TaskId, TaskQueue};
