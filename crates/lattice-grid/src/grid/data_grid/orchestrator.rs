//! Selection and currency transitions.
//!
//! Every user-facing selection operation funnels into
//! [`DataGrid::update_selection_and_currency`] or one of the header
//! variants. They share one shape:
//!
//! 1. resolve and validate the target
//! 2. ask the editing host to commit and the scroll host to reveal the
//!    target; either refusal aborts with nothing changed
//! 3. open a change scope, push the action to the selection model, apply it
//!    to the grid's own selection, move currency
//! 4. close the scope, which flushes events once

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use lattice_grid_core::logging::{span_names, targets};

use super::DataGrid;
use crate::error::{GridError, Result};
use crate::grid::cells::CellInfo;
use crate::grid::columns::ColumnId;
use crate::grid::events::CellCoordinate;
use crate::grid::selection::{
    Navigation, SelectionAction, SelectionGesture, SelectionMode, SelectionRequest,
};
use crate::model::GridItem;

impl<T: GridItem> DataGrid<T> {
    // =========================================================================
    // Selection State
    // =========================================================================

    /// Selected items, in slot order.
    pub fn selected_items(&self) -> Vec<T> {
        self.selected_items
            .get_slots(0)
            .filter_map(|slot| self.item_at_slot(slot))
            .collect()
    }

    /// Selected slots, ascending.
    pub fn selected_slots(&self) -> Vec<usize> {
        self.selected_items.get_slots(0).collect()
    }

    /// Number of selected rows.
    pub fn selected_count(&self) -> usize {
        self.selected_items.len()
    }

    /// Returns `true` if the row at `slot` is selected.
    pub fn is_slot_selected(&self, slot: usize) -> bool {
        self.selected_items.contains(slot)
    }

    /// Selected cells, in selection order.
    pub fn selected_cells(&self) -> &[CellInfo<T>] {
        self.cells.cells()
    }

    /// Returns `true` if the cell at `slot` and `column` is selected.
    pub fn is_cell_selected(&self, slot: usize, column: usize) -> bool {
        self.layout
            .row_index_from_slot(slot)
            .is_some_and(|row| self.cells.contains(row, column))
    }

    /// Returns `true` if every selectable cell of the row at `slot` is
    /// selected.
    pub fn is_row_header_selected(&self, slot: usize) -> bool {
        self.layout
            .row_index_from_slot(slot)
            .is_some_and(|row| self.cells.is_row_header_selected(row))
    }

    /// Columns whose every cell is selected.
    pub fn selected_columns(&self) -> Vec<ColumnId> {
        self.cells
            .selected_columns()
            .filter_map(|c| self.columns.id_at(c))
            .collect()
    }

    /// Returns `true` if every cell of the column is selected.
    pub fn is_column_selected(&self, id: ColumnId) -> bool {
        self.columns
            .index_of(id)
            .is_some_and(|c| self.cells.is_column_selected(c))
    }

    /// Row index of the primary selection.
    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index.get()
    }

    /// The primary selected item.
    pub fn selected_item(&self) -> Option<T> {
        self.selected_item.get()
    }

    /// The current cell.
    pub fn current_cell(&self) -> CellCoordinate {
        self.current
    }

    /// Item of the current row.
    pub fn current_item(&self) -> Option<T> {
        self.current.slot.and_then(|slot| self.item_at_slot(slot))
    }

    /// Anchor of range selections.
    pub fn anchor_slot(&self) -> Option<usize> {
        self.anchor_slot
    }

    // =========================================================================
    // Primary Selection
    // =========================================================================

    /// Make the row at `index` the only selected row and the current row.
    ///
    /// `None` clears the selection. Returns `false`, with the previous value
    /// restored, when the row does not exist or the change was refused.
    pub fn set_selected_index(&mut self, index: Option<usize>) -> bool {
        let Some(row) = index else {
            self.clear_selection();
            return true;
        };
        let Some(slot) = self
            .layout
            .slot_from_row_index(row)
            .filter(|&slot| self.is_valid_slot(slot))
        else {
            tracing::debug!(target: targets::SELECTION, row, "selected index out of range");
            return false;
        };

        let previous = self.selected_index.replace(Some(row));
        let applied =
            self.update_selection_and_currency(None, slot, SelectionAction::SelectCurrent, false);
        match previous {
            Some(previous) if !applied => self.selected_index.set_silent(previous),
            Some(_) if self.selected_index.get() == Some(row) => {
                self.selected_index_changed.emit(Some(row));
            }
            _ => {}
        }
        applied
    }

    /// Make `item` the only selected item and the current row.
    ///
    /// `None` clears the selection. Returns `false` when the item is not
    /// displayed or the change was refused.
    pub fn set_selected_item(&mut self, item: Option<T>) -> bool {
        match item {
            None => self.set_selected_index(None),
            Some(item) => match self.rows.iter().position(|r| *r == item) {
                Some(row) => self.set_selected_index(Some(row)),
                None => false,
            },
        }
    }

    // =========================================================================
    // Currency
    // =========================================================================

    /// Move the current cell without changing the selection.
    ///
    /// `None` for the slot clears currency.
    pub fn set_current_cell(&mut self, column: Option<usize>, slot: Option<usize>) -> bool {
        match slot {
            Some(slot) => {
                self.is_valid_slot(slot)
                    && self.update_selection_and_currency(
                        column,
                        slot,
                        SelectionAction::None,
                        false,
                    )
            }
            None => self.run_selection_step(CellCoordinate::none(), false, |_| {}),
        }
    }

    /// Move the current cell to another column of the current row.
    pub fn set_current_column(&mut self, column: usize) -> Result<bool> {
        if column >= self.columns.len() {
            return Err(GridError::ColumnOutOfRange {
                index: column,
                count: self.columns.len(),
            });
        }
        Ok(match self.current.slot {
            Some(slot) => {
                self.update_selection_and_currency(Some(column), slot, SelectionAction::None, false)
            }
            None => false,
        })
    }

    // =========================================================================
    // Orchestration
    // =========================================================================

    /// Resolve a request's target and apply its selection action and
    /// currency move as one transition.
    ///
    /// Returns `false`, with nothing changed, when the target is out of
    /// bounds, the edit commit fails, or scrolling into view fails.
    pub fn process_selection_and_currency(&mut self, request: SelectionRequest<T>) -> bool {
        let _span = tracing::debug_span!(
            target: targets::SELECTION,
            span_names::PROCESS_SELECTION,
            action = ?request.action,
            backup_slot = request.backup_slot
        )
        .entered();

        let Some(slot) = self.resolve_request_slot(&request) else {
            tracing::debug!(target: targets::SELECTION, "selection target out of bounds");
            return false;
        };
        self.update_selection_and_currency(
            request.column_index,
            slot,
            request.action,
            request.scroll_into_view,
        )
    }

    fn resolve_request_slot(&self, request: &SelectionRequest<T>) -> Option<usize> {
        let slot = request
            .item
            .as_ref()
            .and_then(|item| self.slot_of_item(item))
            .or_else(|| {
                request
                    .group
                    .and_then(|group| self.layout.group_header_slot(group))
            })
            .or_else(|| usize::try_from(request.backup_slot).ok())?;
        self.is_valid_slot(slot).then_some(slot)
    }

    /// Apply `action` at `slot` and make it current.
    ///
    /// Group slots take currency only.
    pub(crate) fn update_selection_and_currency(
        &mut self,
        column: Option<usize>,
        slot: usize,
        action: SelectionAction,
        scroll_into_view: bool,
    ) -> bool {
        if !self.is_valid_slot(slot) {
            return false;
        }
        let action = action.for_mode(self.effective_mode());
        let column = self.coerce_column(column);
        let is_group = self.layout.is_group_slot(slot);
        let target = CellCoordinate::new(column, Some(slot));

        self.run_selection_step(target, scroll_into_view, |grid| {
            if is_group || !action.mutates_selection() {
                return;
            }
            if grid.options.selection_unit.is_cell_based() {
                grid.apply_cell_action(action, slot, column);
            } else {
                grid.apply_row_action(action, slot);
            }
        })
    }

    /// Validate, then run `apply` and move currency inside one change scope.
    fn run_selection_step<F>(&mut self, target: CellCoordinate, scroll: bool, apply: F) -> bool
    where
        F: FnOnce(&mut Self),
    {
        if !self.prepare_move(target, scroll) {
            return false;
        }
        let scope = self.begin_change();
        apply(self);
        self.current = target;
        self.end_change(scope);
        true
    }

    /// Everything that can refuse a transition runs here, before any state
    /// is touched.
    fn prepare_move(&mut self, target: CellCoordinate, scroll: bool) -> bool {
        if target != self.current
            && let Some(host) = self.editing_host.as_mut()
            && host.is_editing()
            && !host.commit_edit()
        {
            tracing::warn!(
                target: targets::SELECTION,
                ?target,
                "edit commit failed; selection unchanged"
            );
            return false;
        }
        if scroll
            && let Some(slot) = target.slot
            && !self.scroll_into_view(slot, target.column)
        {
            tracing::debug!(
                target: targets::SELECTION,
                slot,
                "scroll into view failed; selection unchanged"
            );
            return false;
        }
        true
    }

    /// The anchor, if it still names a data row.
    fn valid_anchor_slot(&self) -> Option<usize> {
        self.anchor_slot
            .filter(|&slot| slot < self.layout.slot_count() && !self.layout.is_group_slot(slot))
    }

    /// Anchor ranges apply in extended mode, with a single-select model
    /// treated as single mode, and only when an anchor exists.
    fn effective_range_allowed(&self, anchor: Option<usize>) -> bool {
        self.effective_mode() == SelectionMode::Extended && anchor.is_some()
    }

    pub(super) fn apply_row_action(&mut self, action: SelectionAction, slot: usize) {
        let Some(index) = self.model_index(slot) else {
            return;
        };
        let anchor = self.valid_anchor_slot();
        let range_allowed = self.effective_range_allowed(anchor);
        let anchor_index = anchor.and_then(|a| self.model_index(a));
        self.adapter
            .apply_action(action, index, anchor_index, range_allowed);

        match action {
            SelectionAction::None => {}
            SelectionAction::AddCurrentToSelection => {
                self.selected_items.add_slot(slot);
                self.anchor_slot = Some(slot);
            }
            SelectionAction::RemoveCurrentFromSelection => {
                self.selected_items.remove_slot(slot);
            }
            SelectionAction::SelectFromAnchorToCurrent => match anchor {
                Some(anchor) if range_allowed => {
                    self.selected_items.clear();
                    self.select_slot_range(anchor.min(slot)..=anchor.max(slot));
                }
                _ => self.select_only_slot(slot),
            },
            SelectionAction::SelectCurrent => self.select_only_slot(slot),
        }
    }

    fn select_only_slot(&mut self, slot: usize) {
        self.selected_items.clear();
        self.selected_items.add_slot(slot);
        self.anchor_slot = Some(slot);
    }

    /// Select the data rows in a slot range, skipping group slots.
    fn select_slot_range(&mut self, slots: RangeInclusive<usize>) {
        if !self.layout.is_grouped() {
            let (start, end) = slots.into_inner();
            self.selected_items.add_slots(start, end - start + 1);
            return;
        }
        for slot in slots {
            if !self.layout.is_group_slot(slot) {
                self.selected_items.add_slot(slot);
            }
        }
    }

    /// Rows of the data slots in a slot range.
    fn rows_in_slots(&self, slots: RangeInclusive<usize>) -> Vec<usize> {
        slots
            .filter_map(|slot| self.layout.row_index_from_slot(slot))
            .collect()
    }

    fn apply_cell_action(&mut self, action: SelectionAction, slot: usize, column: Option<usize>) {
        let (Some(row), Some(column)) = (self.layout.row_index_from_slot(slot), column) else {
            return;
        };
        if !self.columns.is_selectable(column) {
            return;
        }

        match action {
            SelectionAction::None => {}
            SelectionAction::AddCurrentToSelection => {
                self.add_cells([row], &[column]);
                self.anchor_slot = Some(slot);
                self.anchor_column = Some(column);
            }
            SelectionAction::RemoveCurrentFromSelection => {
                self.remove_cells([row], &[column]);
            }
            SelectionAction::SelectFromAnchorToCurrent => {
                let anchor = self.valid_anchor_slot();
                match (anchor, self.anchor_column) {
                    (Some(anchor), Some(anchor_column))
                        if self.effective_range_allowed(Some(anchor)) =>
                    {
                        let rows = self.rows_in_slots(anchor.min(slot)..=anchor.max(slot));
                        let span = anchor_column.min(column)..=anchor_column.max(column);
                        let columns: Vec<usize> = self
                            .columns
                            .selectable_indexes()
                            .into_iter()
                            .filter(|c| span.contains(c))
                            .collect();
                        self.cells.clear();
                        self.add_cells(rows, &columns);
                    }
                    _ => self.select_only_cell(slot, row, column),
                }
            }
            SelectionAction::SelectCurrent => self.select_only_cell(slot, row, column),
        }
        self.sync_rows_from_cells();
    }

    fn select_only_cell(&mut self, slot: usize, row: usize, column: usize) {
        self.cells.clear();
        self.add_cells([row], &[column]);
        self.anchor_slot = Some(slot);
        self.anchor_column = Some(column);
    }

    /// Select every listed cell.
    pub(super) fn add_cells(&mut self, rows: impl IntoIterator<Item = usize>, columns: &[usize]) {
        let selectable = self.columns.selectable_indexes();
        let row_count = self.rows.len();
        for row in rows {
            for &column in columns {
                if let Some(cell) = self.cell_at(row, column) {
                    self.cells.add_cell(cell, &selectable, row_count);
                }
            }
        }
    }

    /// Deselect every listed cell.
    pub(super) fn remove_cells(
        &mut self,
        rows: impl IntoIterator<Item = usize>,
        columns: &[usize],
    ) {
        let selectable = self.columns.selectable_indexes();
        let row_count = self.rows.len();
        let cells = rows
            .into_iter()
            .flat_map(move |row| columns.iter().map(move |&column| (row, column)));
        self.cells.remove_cells(cells, &selectable, row_count);
    }

    /// In cell units a row counts as selected exactly when its row header
    /// is: derive the row selection and push the difference to the model.
    pub(crate) fn sync_rows_from_cells(&mut self) {
        let wanted: BTreeSet<usize> = self
            .cells
            .row_headers()
            .filter_map(|row| self.layout.slot_from_row_index(row))
            .collect();
        let to_remove: Vec<usize> = self
            .selected_items
            .get_slots(0)
            .filter(|slot| !wanted.contains(slot))
            .collect();
        let to_add: Vec<usize> = wanted
            .iter()
            .copied()
            .filter(|&slot| !self.selected_items.contains(slot))
            .collect();
        if to_add.is_empty() && to_remove.is_empty() {
            return;
        }

        for &slot in &to_remove {
            self.selected_items.remove_slot(slot);
        }
        for &slot in &to_add {
            self.selected_items.add_slot(slot);
        }
        let select: Vec<usize> = to_add.iter().filter_map(|&s| self.model_index(s)).collect();
        let deselect: Vec<usize> = to_remove.iter().filter_map(|&s| self.model_index(s)).collect();
        self.adapter.apply_delta(&select, &deselect);
    }

    /// The reverse of [`sync_rows_from_cells`]: rows selected through the
    /// model get all their cells, rows deselected lose theirs.
    ///
    /// [`sync_rows_from_cells`]: Self::sync_rows_from_cells
    pub(crate) fn sync_cells_from_rows(&mut self) {
        let wanted: BTreeSet<usize> = self
            .selected_items
            .get_slots(0)
            .filter_map(|slot| self.layout.row_index_from_slot(slot))
            .collect();
        let have: BTreeSet<usize> = self.cells.row_headers().collect();
        let selectable = self.columns.selectable_indexes();

        let added: Vec<usize> = wanted.difference(&have).copied().collect();
        self.add_cells(added, &selectable);
        let stale: Vec<(usize, usize)> = have
            .difference(&wanted)
            .flat_map(|&row| self.cells.columns_in_row(row).map(move |column| (row, column)))
            .collect();
        self.cells
            .remove_cells(stale, &selectable, self.rows.len());
    }

    // =========================================================================
    // Headers
    // =========================================================================

    /// Handle a click on the row header at `slot`.
    ///
    /// Only the row-header selection units select through the row header.
    pub fn select_row_header(&mut self, slot: usize, gesture: SelectionGesture) -> bool {
        if !self.options.selection_unit.allows_row_header()
            || !self.is_valid_slot(slot)
            || self.layout.is_group_slot(slot)
        {
            return false;
        }
        let Some(row) = self.layout.row_index_from_slot(slot) else {
            return false;
        };
        let mode = self.effective_mode();
        let action = gesture
            .pointer_action(mode, self.cells.is_row_header_selected(row))
            .for_mode(mode);
        let target = CellCoordinate::new(self.coerce_column(None), Some(slot));

        self.run_selection_step(target, false, |grid| {
            let selectable = grid.columns.selectable_indexes();
            match action {
                SelectionAction::None => {}
                SelectionAction::AddCurrentToSelection => {
                    grid.add_cells([row], &selectable);
                    grid.anchor_slot = Some(slot);
                }
                SelectionAction::RemoveCurrentFromSelection => {
                    grid.remove_cells([row], &selectable);
                }
                SelectionAction::SelectFromAnchorToCurrent => {
                    let anchor = grid.valid_anchor_slot();
                    grid.cells.clear();
                    match anchor {
                        Some(anchor) if grid.effective_range_allowed(Some(anchor)) => {
                            let rows = grid.rows_in_slots(anchor.min(slot)..=anchor.max(slot));
                            grid.add_cells(rows, &selectable);
                        }
                        _ => {
                            grid.add_cells([row], &selectable);
                            grid.anchor_slot = Some(slot);
                        }
                    }
                }
                SelectionAction::SelectCurrent => {
                    grid.cells.clear();
                    grid.add_cells([row], &selectable);
                    grid.anchor_slot = Some(slot);
                }
            }
            grid.sync_rows_from_cells();
        })
    }

    /// Handle a click on the header of the column at `column`.
    ///
    /// Only the column-header selection units in extended mode select
    /// through the column header.
    pub fn select_column_header(&mut self, column: usize, gesture: SelectionGesture) -> bool {
        if !self.options.selection_unit.allows_column_header()
            || self.effective_mode() == SelectionMode::Single
            || !self.columns.is_selectable(column)
            || self.rows.is_empty()
        {
            return false;
        }
        let selected = self.cells.is_column_selected(column);
        let action = gesture.pointer_action(SelectionMode::Extended, selected);
        let slot = self
            .current
            .slot
            .filter(|&s| self.is_valid_slot(s) && !self.layout.is_group_slot(s))
            .or_else(|| self.layout.next_row_slot(None));
        let target = CellCoordinate::new(Some(column), slot);

        self.run_selection_step(target, false, |grid| {
            let all_rows = 0..grid.rows.len();
            match action {
                SelectionAction::None => {}
                SelectionAction::AddCurrentToSelection => {
                    grid.add_cells(all_rows, &[column]);
                    grid.anchor_column = Some(column);
                }
                SelectionAction::RemoveCurrentFromSelection => {
                    grid.remove_cells(all_rows, &[column]);
                }
                SelectionAction::SelectFromAnchorToCurrent => {
                    let anchor = grid.anchor_column.filter(|&c| grid.columns.is_selectable(c));
                    grid.cells.clear();
                    let columns: Vec<usize> = match anchor {
                        Some(anchor) => grid
                            .columns
                            .selectable_indexes()
                            .into_iter()
                            .filter(|c| (anchor.min(column)..=anchor.max(column)).contains(c))
                            .collect(),
                        None => {
                            grid.anchor_column = Some(column);
                            vec![column]
                        }
                    };
                    grid.add_cells(all_rows, &columns);
                }
                SelectionAction::SelectCurrent => {
                    grid.cells.clear();
                    grid.add_cells(all_rows, &[column]);
                    grid.anchor_column = Some(column);
                }
            }
            grid.sync_rows_from_cells();
        })
    }

    // =========================================================================
    // Gestures
    // =========================================================================

    /// Handle a pointer press on the cell at `slot` and `column`.
    ///
    /// `slot` comes from hit-testing and may be out of range, in which case
    /// nothing happens.
    pub fn click_cell(
        &mut self,
        slot: isize,
        column: Option<usize>,
        gesture: SelectionGesture,
    ) -> bool {
        let target_selected = usize::try_from(slot).is_ok_and(|slot| {
            if self.options.selection_unit.is_cell_based() {
                self.coerce_column(column)
                    .is_some_and(|c| self.is_cell_selected(slot, c))
            } else {
                self.selected_items.contains(slot)
            }
        });
        let action = gesture.pointer_action(self.effective_mode(), target_selected);
        let mut request = SelectionRequest::slot(slot, action);
        request.column_index = column;
        self.process_selection_and_currency(request)
    }

    /// Move currency with the keyboard.
    pub fn move_current(&mut self, navigation: Navigation, gesture: SelectionGesture) -> bool {
        let current = self.current.slot.filter(|&s| self.is_valid_slot(s));
        let target = match navigation {
            Navigation::Up => match current {
                Some(slot) => self.layout.previous_visible_slot(Some(slot)),
                None => self.layout.next_visible_slot(None),
            },
            Navigation::Down => self.layout.next_visible_slot(current),
            Navigation::Home => self.layout.next_visible_slot(None),
            Navigation::End => self.layout.previous_visible_slot(None),
            Navigation::PageUp | Navigation::PageDown => self.page_target(current, navigation),
        };
        let Some(target) = target else {
            return false;
        };
        let action = gesture.keyboard_action(self.effective_mode());
        self.update_selection_and_currency(self.current.column, target, action, true)
    }

    /// Slot one viewport away from `from`, clamped to the first or last
    /// visible slot.
    fn page_target(&self, from: Option<usize>, navigation: Navigation) -> Option<usize> {
        let page = self.displayed_slots().len().saturating_sub(1).max(1);
        let mut slot = from;
        for _ in 0..page {
            let next = match navigation {
                Navigation::PageUp => self.layout.previous_visible_slot(slot),
                _ => self.layout.next_visible_slot(slot),
            };
            match next {
                Some(next) => slot = Some(next),
                None => break,
            }
        }
        slot
    }

    // =========================================================================
    // Bulk Operations
    // =========================================================================

    /// Select every row, or every cell in the cell units.
    ///
    /// Does nothing in single mode.
    pub fn select_all(&mut self) {
        if self.effective_mode() == SelectionMode::Single {
            return;
        }
        if self.options.selection_unit.is_cell_based() {
            self.select_all_cells();
            return;
        }
        let scope = self.begin_change();
        self.adapter.select_all();
        if self.layout.is_grouped() {
            for row in 0..self.rows.len() {
                if let Some(slot) = self.layout.slot_from_row_index(row) {
                    self.selected_items.add_slot(slot);
                }
            }
        } else if !self.rows.is_empty() {
            self.selected_items.add_slots(0, self.rows.len());
        }
        self.end_change(scope);
    }

    /// Select every selectable cell. Does nothing in single mode.
    pub fn select_all_cells(&mut self) {
        if self.effective_mode() == SelectionMode::Single {
            return;
        }
        if !self.options.selection_unit.is_cell_based() {
            self.select_all();
            return;
        }
        let scope = self.begin_change();
        let selectable = self.columns.selectable_indexes();
        self.add_cells(0..self.rows.len(), &selectable);
        self.sync_rows_from_cells();
        self.end_change(scope);
    }

    /// Deselect everything. Currency stays.
    pub fn clear_selection(&mut self) {
        let scope = self.begin_change();
        self.clear_selection_state();
        self.end_change(scope);
    }

    pub(crate) fn clear_selection_state(&mut self) {
        self.adapter.clear();
        self.selected_items.clear();
        self.cells.clear();
        self.anchor_slot = None;
        self.anchor_column = None;
    }
}
