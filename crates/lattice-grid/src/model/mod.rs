//! Models the grid consumes.
//!
//! The grid is a view over pluggable models. This module defines their
//! contracts and ships default implementations:
//!
//! - `ItemSource`: an indexable item sequence, the selection model's source
//! - `SelectionModel`: index-based selection with batching and signals;
//!   `IndexSelectionModel` is the default
//! - `CollectionView`: a flat, filterable, sortable, pageable source
//! - `HierarchicalModel`: a tree exposed as a flattened row list, reporting
//!   structural changes with a `FlattenedIndexMap`
//! - `RowHeightEstimator`: content-offset estimation for virtualized rows
//!
//! # Architecture Overview
//!
//! ```text
//! ┌────────────────┐  signals   ┌────────────┐  dispatch_pending  ┌──────────┐
//! │ CollectionView │──────────> │            │ ─────────────────> │          │
//! │ Hierarchical.. │            │  Grid      │                    │ DataGrid │
//! │ SelectionModel │──────────> │  inbox     │                    │          │
//! └────────────────┘            └────────────┘                    └──────────┘
//!         ^                                                             │
//!         └─────────────── select / deselect (sync guarded) ────────────┘
//! ```

mod collection_view;
mod hierarchy;
mod index_map;
mod row_height;
mod selection_model;
mod traits;

pub use collection_view::{CollectionView, CompareFn, FilterFn};
pub use hierarchy::{FlattenedChangedArgs, HierarchicalModel, NodeKey};
pub use index_map::{FlattenedChange, FlattenedIndexMap};
pub use row_height::{AverageRowHeightEstimator, DEFAULT_ROW_HEIGHT, RowHeightEstimator};
pub use selection_model::{
    IndexSelectionModel, IndexesChange, SelectionModel, SelectionModelChange,
    SelectionModelProperty, SelectionModelSignals,
};
pub use traits::{GridItem, ItemSource, VecSource};
