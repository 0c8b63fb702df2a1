//! Two-way binding of the selection to host-owned lists.
//!
//! Host edits to a bound list arrive as inbox messages and are applied as
//! selection changes; the resulting flush writes back only what the list
//! does not already say, so an edit never echoes into a second list write.

use std::sync::Arc;

use lattice_grid_core::logging::targets;
use lattice_grid_core::{CollectionChange, ObservableList};

use super::DataGrid;
use crate::grid::binding::BoundList;
use crate::grid::cells::CellInfo;
use crate::grid::columns::ColumnId;
use crate::grid::message::GridMessage;
use crate::grid::selection::{SelectionAction, SelectionMode};
use crate::model::GridItem;

impl<T: GridItem> DataGrid<T> {
    // =========================================================================
    // Binding
    // =========================================================================

    /// Bind the selected items to `list`.
    ///
    /// A non-empty list becomes the selection; an empty one is filled from
    /// the current selection.
    pub fn bind_selected_items(&mut self, list: Arc<ObservableList<T>>) {
        let initial = list.to_vec();
        self.bindings.items = Some(BoundList::bind(
            list,
            "selected_items",
            self.inbox.sender(),
            GridMessage::SelectedItemsBinding,
        ));
        if initial.is_empty() {
            let selected = self.selected_items();
            if let Some(binding) = &self.bindings.items {
                binding.reset_to(selected);
            }
        } else {
            self.resync_items_from_list();
        }
    }

    /// Bind the selected cells to `list`.
    pub fn bind_selected_cells(&mut self, list: Arc<ObservableList<CellInfo<T>>>) {
        let initial = list.to_vec();
        self.bindings.cells = Some(BoundList::bind(
            list,
            "selected_cells",
            self.inbox.sender(),
            GridMessage::SelectedCellsBinding,
        ));
        if initial.is_empty() {
            let selected = self.cells.cells().to_vec();
            if let Some(binding) = &self.bindings.cells {
                binding.reset_to(selected);
            }
        } else {
            self.resync_cells_from_list();
        }
    }

    /// Bind the fully selected columns to `list`.
    pub fn bind_selected_columns(&mut self, list: Arc<ObservableList<ColumnId>>) {
        let initial = list.to_vec();
        self.bindings.columns = Some(BoundList::bind(
            list,
            "selected_columns",
            self.inbox.sender(),
            GridMessage::SelectedColumnsBinding,
        ));
        if initial.is_empty() {
            let selected = self.selected_columns();
            if let Some(binding) = &self.bindings.columns {
                binding.reset_to(selected);
            }
        } else {
            self.resync_columns_from_list();
        }
    }

    /// Stop syncing the selected-items list.
    pub fn unbind_selected_items(&mut self) -> Option<Arc<ObservableList<T>>> {
        self.bindings.items.take().map(|b| Arc::clone(b.list()))
    }

    /// Stop syncing the selected-cells list.
    pub fn unbind_selected_cells(&mut self) -> Option<Arc<ObservableList<CellInfo<T>>>> {
        self.bindings.cells.take().map(|b| Arc::clone(b.list()))
    }

    /// Stop syncing the selected-columns list.
    pub fn unbind_selected_columns(&mut self) -> Option<Arc<ObservableList<ColumnId>>> {
        self.bindings.columns.take().map(|b| Arc::clone(b.list()))
    }

    // =========================================================================
    // Selected Items
    // =========================================================================

    pub(crate) fn on_selected_items_list_changed(&mut self, change: CollectionChange<T>) {
        if self.bindings.items.is_none() {
            return;
        }
        let scope = self.begin_change();
        match change {
            CollectionChange::Add { items, .. } => self.select_listed_items(&items),
            CollectionChange::Remove { items, .. } => self.deselect_listed_items(&items),
            CollectionChange::Replace {
                old_items,
                new_items,
                ..
            } => {
                self.deselect_listed_items(&old_items);
                self.select_listed_items(&new_items);
            }
            CollectionChange::Move { .. } => {}
            CollectionChange::Reset => self.resync_items_from_list(),
        }
        self.end_change(scope);
    }

    fn resync_items_from_list(&mut self) {
        let Some(items) = self.bindings.items.as_ref().map(|b| b.list().to_vec()) else {
            return;
        };
        let scope = self.begin_change();
        self.clear_selection_state();
        if self.effective_mode() == SelectionMode::Single {
            self.select_listed_items(items.last().map(std::slice::from_ref).unwrap_or_default());
        } else {
            self.select_listed_items(&items);
        }
        self.end_change(scope);
    }

    fn select_listed_items(&mut self, items: &[T]) {
        let single = self.effective_mode() == SelectionMode::Single;
        let mut unknown = Vec::new();
        for item in items {
            match self.slot_of_item(item) {
                Some(slot) if self.options.selection_unit.is_cell_based() => {
                    if single {
                        self.cells.clear();
                    }
                    if let Some(row) = self.layout.row_index_from_slot(slot) {
                        let selectable = self.columns.selectable_indexes();
                        self.add_cells([row], &selectable);
                    }
                    self.sync_rows_from_cells();
                }
                Some(slot) => {
                    let action = if single {
                        SelectionAction::SelectCurrent
                    } else {
                        SelectionAction::AddCurrentToSelection
                    };
                    self.apply_row_action(action, slot);
                }
                None => {
                    // Off-page items are still selectable through the model.
                    let index = self
                        .source
                        .as_ref()
                        .and_then(|s| s.item_source().index_of(item));
                    match index {
                        Some(index) => {
                            if single {
                                self.adapter.clear();
                                self.selected_items.clear();
                            }
                            self.adapter.select(index);
                        }
                        None => unknown.push(item.clone()),
                    }
                }
            }
        }
        if !unknown.is_empty() {
            tracing::warn!(
                target: targets::BINDING,
                count = unknown.len(),
                "bound items not in the data source dropped"
            );
            if let Some(binding) = &self.bindings.items {
                binding.push_delta(&[], &unknown);
            }
        }
    }

    fn deselect_listed_items(&mut self, items: &[T]) {
        for item in items {
            match self.slot_of_item(item) {
                Some(slot) if self.options.selection_unit.is_cell_based() => {
                    if let Some(row) = self.layout.row_index_from_slot(slot) {
                        let columns: Vec<usize> = self.cells.columns_in_row(row).collect();
                        self.remove_cells([row], &columns);
                    }
                    self.sync_rows_from_cells();
                }
                Some(slot) => {
                    self.apply_row_action(SelectionAction::RemoveCurrentFromSelection, slot);
                }
                None => {
                    if let Some(index) = self
                        .source
                        .as_ref()
                        .and_then(|s| s.item_source().index_of(item))
                    {
                        self.adapter.deselect(index);
                    }
                }
            }
        }
    }

    // =========================================================================
    // Selected Cells
    // =========================================================================

    pub(crate) fn on_selected_cells_list_changed(&mut self, change: CollectionChange<CellInfo<T>>) {
        if self.bindings.cells.is_none() {
            return;
        }
        let scope = self.begin_change();
        match change {
            CollectionChange::Add { items, .. } => self.select_listed_cells(&items),
            CollectionChange::Remove { items, .. } => self.deselect_listed_cells(&items),
            CollectionChange::Replace {
                old_items,
                new_items,
                ..
            } => {
                self.deselect_listed_cells(&old_items);
                self.select_listed_cells(&new_items);
            }
            CollectionChange::Move { .. } => {}
            CollectionChange::Reset => self.resync_cells_from_list(),
        }
        self.end_change(scope);
    }

    fn resync_cells_from_list(&mut self) {
        let Some(cells) = self.bindings.cells.as_ref().map(|b| b.list().to_vec()) else {
            return;
        };
        let scope = self.begin_change();
        self.cells.clear();
        self.select_listed_cells(&cells);
        self.end_change(scope);
    }

    /// Grid position of a host-supplied cell reference.
    fn resolve_cell(&self, cell: &CellInfo<T>) -> Option<(usize, usize)> {
        let row = self.rows.iter().position(|r| *r == cell.item)?;
        let column = self.columns.index_of(cell.column)?;
        self.columns.is_selectable(column).then_some((row, column))
    }

    fn select_listed_cells(&mut self, cells: &[CellInfo<T>]) {
        if !self.options.selection_unit.is_cell_based() {
            tracing::warn!(
                target: targets::BINDING,
                "cell list edited outside the cell selection units"
            );
            if let Some(binding) = &self.bindings.cells {
                binding.push_delta(&[], cells);
            }
            return;
        }
        let single = self.effective_mode() == SelectionMode::Single;
        let mut unknown = Vec::new();
        for cell in cells {
            match self.resolve_cell(cell) {
                Some((row, column)) => {
                    if single {
                        self.cells.clear();
                    }
                    self.add_cells([row], &[column]);
                }
                None => unknown.push(cell.clone()),
            }
        }
        self.sync_rows_from_cells();
        if !unknown.is_empty() {
            tracing::warn!(
                target: targets::BINDING,
                count = unknown.len(),
                "bound cells not in the grid dropped"
            );
            if let Some(binding) = &self.bindings.cells {
                binding.push_delta(&[], &unknown);
            }
        }
    }

    fn deselect_listed_cells(&mut self, cells: &[CellInfo<T>]) {
        for cell in cells {
            if let Some((row, column)) = self.resolve_cell(cell) {
                self.remove_cells([row], &[column]);
            }
        }
        self.sync_rows_from_cells();
    }

    // =========================================================================
    // Selected Columns
    // =========================================================================

    pub(crate) fn on_selected_columns_list_changed(&mut self, change: CollectionChange<ColumnId>) {
        if self.bindings.columns.is_none() {
            return;
        }
        let scope = self.begin_change();
        match change {
            CollectionChange::Add { items, .. } => self.select_listed_columns(&items),
            CollectionChange::Remove { items, .. } => self.deselect_listed_columns(&items),
            CollectionChange::Replace {
                old_items,
                new_items,
                ..
            } => {
                self.deselect_listed_columns(&old_items);
                self.select_listed_columns(&new_items);
            }
            CollectionChange::Move { .. } => {}
            CollectionChange::Reset => self.resync_columns_from_list(),
        }
        self.end_change(scope);
    }

    fn resync_columns_from_list(&mut self) {
        let Some(columns) = self.bindings.columns.as_ref().map(|b| b.list().to_vec()) else {
            return;
        };
        let scope = self.begin_change();
        let selected = self.selected_columns();
        self.deselect_listed_columns(&selected);
        self.select_listed_columns(&columns);
        self.end_change(scope);
    }

    fn select_listed_columns(&mut self, ids: &[ColumnId]) {
        let allowed = self.options.selection_unit.allows_column_header()
            && self.effective_mode() == SelectionMode::Extended;
        let mut rejected = Vec::new();
        for &id in ids {
            match self.columns.index_of(id) {
                Some(column) if allowed && self.columns.is_selectable(column) => {
                    self.add_cells(0..self.rows.len(), &[column]);
                }
                _ => rejected.push(id),
            }
        }
        self.sync_rows_from_cells();
        if !rejected.is_empty() {
            tracing::warn!(
                target: targets::BINDING,
                count = rejected.len(),
                "bound columns that cannot be selected dropped"
            );
            if let Some(binding) = &self.bindings.columns {
                binding.push_delta(&[], &rejected);
            }
        }
    }

    fn deselect_listed_columns(&mut self, ids: &[ColumnId]) {
        for &id in ids {
            if let Some(column) = self.columns.index_of(id) {
                self.remove_cells(0..self.rows.len(), &[column]);
            }
        }
        self.sync_rows_from_cells();
    }
}
