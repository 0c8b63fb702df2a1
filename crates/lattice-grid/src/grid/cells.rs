//! Cell-level selection state.
//!
//! [`CellSelection`] keeps three views of the selected cells in step:
//!
//! - a `row → {column}` map for membership tests
//! - an ordered list of [`CellInfo`] records, in selection order
//! - a per-column counter of selected cells
//!
//! Two derived sets hang off these. A row's header is selected when every
//! selectable column of that row is selected. A column is selected when its
//! counter equals the current row count. Both are recomputed whenever their
//! inputs change, including every row-count change.

use std::collections::{BTreeMap, BTreeSet};

use super::columns::ColumnId;
use super::selected_items::SelectionDelta;

/// A cell reference: an item and a column.
///
/// Two cell infos are equal when they refer to the same item and column; the
/// cached positions do not take part in the comparison.
#[derive(Debug, Clone)]
pub struct CellInfo<T> {
    /// The row's item.
    pub item: T,
    /// The cell's column.
    pub column: ColumnId,
    /// Row index at the time the record was produced.
    pub row_index: usize,
    /// Column index at the time the record was produced.
    pub column_index: usize,
    /// Whether the positions were resolved against the grid.
    pub is_valid: bool,
}

impl<T> CellInfo<T> {
    /// An unresolved cell reference, as a host would construct one.
    pub fn new(item: T, column: ColumnId) -> Self {
        Self {
            item,
            column,
            row_index: 0,
            column_index: 0,
            is_valid: false,
        }
    }

    /// A cell reference resolved to grid positions.
    pub fn resolved(item: T, column: ColumnId, row_index: usize, column_index: usize) -> Self {
        Self {
            item,
            column,
            row_index,
            column_index,
            is_valid: true,
        }
    }
}

impl<T: PartialEq> PartialEq for CellInfo<T> {
    fn eq(&self, other: &Self) -> bool {
        self.item == other.item && self.column == other.column
    }
}

/// Selected cells plus the derived row-header and column sets.
#[derive(Debug, Clone)]
pub struct CellSelection<T> {
    by_row: BTreeMap<usize, BTreeSet<usize>>,
    cells: Vec<CellInfo<T>>,
    column_counts: BTreeMap<usize, usize>,
    selected_columns: BTreeSet<usize>,
    row_headers: BTreeSet<usize>,
    flushed: BTreeMap<(usize, usize), CellInfo<T>>,
    pending_removed: Vec<CellInfo<T>>,
}

impl<T> Default for CellSelection<T> {
    fn default() -> Self {
        Self {
            by_row: BTreeMap::new(),
            cells: Vec::new(),
            column_counts: BTreeMap::new(),
            selected_columns: BTreeSet::new(),
            row_headers: BTreeSet::new(),
            flushed: BTreeMap::new(),
            pending_removed: Vec::new(),
        }
    }
}

impl<T: Clone> CellSelection<T> {
    /// Create an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Number of selected cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if the cell is selected.
    pub fn contains(&self, row: usize, column: usize) -> bool {
        self.by_row.get(&row).is_some_and(|cols| cols.contains(&column))
    }

    /// Selected cells in selection order.
    pub fn cells(&self) -> &[CellInfo<T>] {
        &self.cells
    }

    /// Selected column indexes within a row.
    pub fn columns_in_row(&self, row: usize) -> impl Iterator<Item = usize> + '_ {
        self.by_row.get(&row).into_iter().flatten().copied()
    }

    /// Number of selected cells in a column.
    pub fn column_count(&self, column: usize) -> usize {
        self.column_counts.get(&column).copied().unwrap_or(0)
    }

    /// Returns `true` if every row's cell in `column` is selected.
    pub fn is_column_selected(&self, column: usize) -> bool {
        self.selected_columns.contains(&column)
    }

    /// Fully selected column indexes, ascending.
    pub fn selected_columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.selected_columns.iter().copied()
    }

    /// Returns `true` if every selectable cell of `row` is selected.
    pub fn is_row_header_selected(&self, row: usize) -> bool {
        self.row_headers.contains(&row)
    }

    /// Rows whose header is selected, ascending.
    pub fn row_headers(&self) -> impl Iterator<Item = usize> + '_ {
        self.row_headers.iter().copied()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Select a cell. `selectable` lists the selectable column indexes.
    ///
    /// Returns `false` if the cell was already selected.
    pub fn add_cell(&mut self, cell: CellInfo<T>, selectable: &[usize], row_count: usize) -> bool {
        let (row, column) = (cell.row_index, cell.column_index);
        if !self.insert_raw(cell) {
            return false;
        }
        self.refresh_column(column, row_count);
        self.refresh_row_header(row, selectable);
        true
    }

    /// Deselect a cell. Returns `false` if it was not selected.
    pub fn remove_cell(
        &mut self,
        row: usize,
        column: usize,
        selectable: &[usize],
        row_count: usize,
    ) -> bool {
        self.remove_cells([(row, column)], selectable, row_count) == 1
    }

    /// Deselect every listed `(row, column)` cell in one pass over the
    /// selection order. Returns the number of cells deselected.
    pub fn remove_cells<I>(&mut self, cells: I, selectable: &[usize], row_count: usize) -> usize
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut rows = BTreeSet::new();
        let mut columns = BTreeSet::new();
        let mut removed = 0;
        for (row, column) in cells {
            let Some(cols) = self.by_row.get_mut(&row) else {
                continue;
            };
            if !cols.remove(&column) {
                continue;
            }
            if cols.is_empty() {
                self.by_row.remove(&row);
            }
            if let Some(count) = self.column_counts.get_mut(&column) {
                *count -= 1;
                if *count == 0 {
                    self.column_counts.remove(&column);
                }
            }
            rows.insert(row);
            columns.insert(column);
            removed += 1;
        }
        if removed == 0 {
            return 0;
        }

        let by_row = &self.by_row;
        self.cells.retain(|c| {
            by_row
                .get(&c.row_index)
                .is_some_and(|cols| cols.contains(&c.column_index))
        });
        for column in columns {
            self.refresh_column(column, row_count);
        }
        for row in rows {
            self.refresh_row_header(row, selectable);
        }
        removed
    }

    /// Deselect every cell.
    pub fn clear(&mut self) {
        self.by_row.clear();
        self.cells.clear();
        self.column_counts.clear();
        self.selected_columns.clear();
        self.row_headers.clear();
    }

    fn insert_raw(&mut self, cell: CellInfo<T>) -> bool {
        if !self
            .by_row
            .entry(cell.row_index)
            .or_default()
            .insert(cell.column_index)
        {
            return false;
        }
        *self.column_counts.entry(cell.column_index).or_insert(0) += 1;
        self.cells.push(cell);
        true
    }

    fn refresh_column(&mut self, column: usize, row_count: usize) {
        if row_count > 0 && self.column_count(column) == row_count {
            self.selected_columns.insert(column);
        } else {
            self.selected_columns.remove(&column);
        }
    }

    fn refresh_row_header(&mut self, row: usize, selectable: &[usize]) {
        let full = !selectable.is_empty()
            && self
                .by_row
                .get(&row)
                .is_some_and(|cols| selectable.iter().all(|c| cols.contains(c)));
        if full {
            self.row_headers.insert(row);
        } else {
            self.row_headers.remove(&row);
        }
    }

    /// Recompute the selected-column set against the current row count.
    pub fn refresh_selected_columns_from_counts(&mut self, row_count: usize) {
        self.selected_columns = self
            .column_counts
            .iter()
            .filter(|&(_, &count)| row_count > 0 && count == row_count)
            .map(|(&column, _)| column)
            .collect();
    }

    /// Recompute every row-header flag against the selectable columns.
    pub fn refresh_row_headers(&mut self, selectable: &[usize]) {
        let rows: Vec<usize> = self.by_row.keys().copied().collect();
        self.row_headers.clear();
        for row in rows {
            self.refresh_row_header(row, selectable);
        }
    }

    // =========================================================================
    // Structural changes
    // =========================================================================

    /// Translate every cell's row and column through the given maps.
    ///
    /// Cells whose row or column does not map are dropped. Returns the number
    /// of selected cells dropped.
    pub fn remap<R, C>(
        &mut self,
        row_map: R,
        column_map: C,
        selectable: &[usize],
        row_count: usize,
    ) -> usize
    where
        R: Fn(usize) -> Option<usize>,
        C: Fn(usize) -> Option<usize>,
    {
        let map = |cell: &mut CellInfo<T>| -> bool {
            match (row_map(cell.row_index), column_map(cell.column_index)) {
                (Some(row), Some(column)) => {
                    cell.row_index = row;
                    cell.column_index = column;
                    true
                }
                _ => false,
            }
        };

        let old = std::mem::take(&mut self.cells);
        self.clear();
        let mut dropped = 0;
        for mut cell in old {
            if map(&mut cell) {
                self.insert_raw(cell);
            } else {
                dropped += 1;
            }
        }

        let flushed = std::mem::take(&mut self.flushed);
        for (_, mut cell) in flushed {
            if map(&mut cell) {
                self.flushed
                    .insert((cell.row_index, cell.column_index), cell);
            } else {
                self.pending_removed.push(cell);
            }
        }

        self.refresh_selected_columns_from_counts(row_count);
        self.refresh_row_headers(selectable);
        dropped
    }

    /// Shift rows for `count` rows inserted at `row`.
    pub fn insert_rows(
        &mut self,
        row: usize,
        count: usize,
        selectable: &[usize],
        row_count: usize,
    ) {
        self.remap(
            |r| Some(if r >= row { r + count } else { r }),
            Some,
            selectable,
            row_count,
        );
    }

    /// Drop and shift for `count` rows removed at `row`.
    pub fn remove_rows(
        &mut self,
        row: usize,
        count: usize,
        selectable: &[usize],
        row_count: usize,
    ) {
        let end = row + count;
        self.remap(
            |r| match r {
                r if r < row => Some(r),
                r if r < end => None,
                r => Some(r - count),
            },
            Some,
            selectable,
            row_count,
        );
    }

    /// Carry the cells of one row to a new row position.
    pub fn move_row(
        &mut self,
        old_row: usize,
        new_row: usize,
        selectable: &[usize],
        row_count: usize,
    ) {
        self.remap(
            |r| {
                let without = match r {
                    r if r == old_row => return Some(new_row),
                    r if r > old_row => r - 1,
                    r => r,
                };
                Some(if without >= new_row { without + 1 } else { without })
            },
            Some,
            selectable,
            row_count,
        );
    }

    /// Drop the cells of a removed column and shift the following columns.
    pub fn remove_column(&mut self, column: usize, selectable: &[usize], row_count: usize) {
        self.remap(
            Some,
            |c| match c {
                c if c < column => Some(c),
                c if c == column => None,
                c => Some(c - 1),
            },
            selectable,
            row_count,
        );
    }

    // =========================================================================
    // Flush
    // =========================================================================

    /// Compute the cell delta since the last flush and start a new baseline.
    pub fn take_delta(&mut self) -> SelectionDelta<CellInfo<T>> {
        let added = self
            .cells
            .iter()
            .filter(|c| !self.flushed.contains_key(&(c.row_index, c.column_index)))
            .cloned()
            .collect();
        let mut removed = std::mem::take(&mut self.pending_removed);
        removed.extend(
            self.flushed
                .iter()
                .filter(|((row, column), _)| !self.contains(*row, *column))
                .map(|(_, cell)| cell.clone()),
        );
        self.flushed = self
            .cells
            .iter()
            .map(|c| ((c.row_index, c.column_index), c.clone()))
            .collect();
        SelectionDelta { added, removed }
    }
}
