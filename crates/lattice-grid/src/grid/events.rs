//! Event payloads emitted by the grid.
//!
//! Every payload describes the net change of one outermost operation; nested
//! operations never produce intermediate events.

use super::cells::CellInfo;
use super::columns::ColumnId;

/// Payload of `DataGrid::selection_changed`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionChangedEventArgs<T> {
    /// Items that became selected.
    pub added_items: Vec<T>,
    /// Items that stopped being selected.
    pub removed_items: Vec<T>,
}

/// Payload of `DataGrid::selected_cells_changed`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedCellsChangedEventArgs<T> {
    /// Cells that became selected.
    pub added_cells: Vec<CellInfo<T>>,
    /// Cells that stopped being selected.
    pub removed_cells: Vec<CellInfo<T>>,
}

/// Payload of `DataGrid::selected_columns_changed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedColumnsChangedEventArgs {
    /// Columns that became fully selected.
    pub added_columns: Vec<ColumnId>,
    /// Columns that stopped being fully selected.
    pub removed_columns: Vec<ColumnId>,
}

/// A current-cell coordinate: column index and slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellCoordinate {
    /// Column index, if any column is current.
    pub column: Option<usize>,
    /// Slot, if any row is current.
    pub slot: Option<usize>,
}

impl CellCoordinate {
    /// A coordinate with both parts set.
    pub fn new(column: Option<usize>, slot: Option<usize>) -> Self {
        Self { column, slot }
    }

    /// The empty coordinate.
    pub fn none() -> Self {
        Self::default()
    }
}

/// Payload of `DataGrid::current_cell_changed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentCellChangedEventArgs {
    /// Current cell before the operation.
    pub old: CellCoordinate,
    /// Current cell after the operation.
    pub new: CellCoordinate,
}
