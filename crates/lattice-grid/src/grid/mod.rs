//! The data grid and its selection machinery.
//!
//! [`DataGrid`] owns no widgets. It keeps the selection, currency and scroll
//! state of a virtualized grid consistent with its data source and its
//! selection model, and reports net changes through signals. The host feeds
//! it input gestures, viewport geometry and an event-loop tick
//! ([`DataGrid::dispatch_pending`] and [`DataGrid::run_deferred`]).
//!
//! # Slots
//!
//! The grid addresses displayed positions as *slots*. With no row groups a
//! slot is a row index; with row groups, header and footer slots are
//! interleaved between the rows, and rows of collapsed groups keep their
//! slots but take no space. [`SlotLayout`] converts between slots, row
//! indexes and selection-model indexes.
//!
//! # Selection Units
//!
//! | Unit | Click | Row header | Column header |
//! |------|-------|------------|---------------|
//! | `FullRow` | row | - | - |
//! | `CellOrRowHeader` | cell | row's cells | - |
//! | `CellOrColumnHeader` | cell | - | column's cells |
//! | `CellOrRowOrColumnHeader` | cell | row's cells | column's cells |
//!
//! In the cell units a row counts as selected exactly when every selectable
//! cell in it is.

mod adapter;
mod binding;
mod cells;
mod columns;
mod data;
mod data_grid;
mod events;
mod hosts;
mod index_table;
mod message;
mod selected_items;
mod selection;
mod slots;
mod viewport;

pub use cells::CellInfo;
pub use columns::{Column, ColumnId, Columns};
pub use data::DataSource;
pub use data_grid::{DataGrid, GridOptions, HierarchicalAnchor};
pub use events::{
    CellCoordinate, CurrentCellChangedEventArgs, SelectedCellsChangedEventArgs,
    SelectedColumnsChangedEventArgs, SelectionChangedEventArgs,
};
pub use hosts::{EditingHost, ScrollHost};
pub use index_table::IndexToValueTable;
pub use selection::{
    Navigation, SelectionAction, SelectionGesture, SelectionMode, SelectionRequest, SelectionUnit,
};
pub use slots::{GroupSpec, RowGroupInfo, SlotLayout};
pub use viewport::{RowVisualState, Viewport};
