//! Lattice Grid - the selection, currency and scroll engine of a virtualized
//! data grid.
//!
//! This crate provides:
//!
//! - **Models** ([`model`]): the selection model contract with a default
//!   index-based implementation, a filterable/sortable/pageable
//!   `CollectionView`, a `HierarchicalModel` flattened into rows, and row
//!   height estimation
//! - **Grid** ([`grid`]): the `DataGrid` orchestrator keeping row, cell and
//!   column selection, the current cell, bound external lists and the
//!   selection model in agreement while the data changes underneath
//!
//! The grid is toolkit-agnostic. Rendering, hit-testing and real scrolling
//! belong to the host, which talks to the grid through gestures, viewport
//! geometry and the [`EditingHost`](grid::EditingHost) and
//! [`ScrollHost`](grid::ScrollHost) traits.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use lattice_grid::grid::{DataGrid, Navigation, SelectionGesture};
//! use lattice_grid::model::CollectionView;
//!
//! let view = Arc::new(CollectionView::new(vec![10, 20, 30, 40]));
//! let mut grid = DataGrid::new().with_data_source(view.clone().into());
//! grid.add_column("Value");
//!
//! grid.click_cell(0, None, SelectionGesture::plain());
//! grid.move_current(Navigation::Down, SelectionGesture::shift());
//! assert_eq!(grid.selected_items(), vec![10, 20]);
//!
//! // Source changes are queued and applied from the host's event loop.
//! view.insert(0, 5);
//! grid.dispatch_pending();
//! assert_eq!(grid.selected_slots(), vec![1, 2]);
//! ```
//!
//! # Logging
//!
//! Instrumentation goes through `tracing` with the targets listed in
//! [`lattice_grid_core::logging::targets`].

mod error;
pub mod grid;
pub mod model;

pub use error::{GridError, Result};
