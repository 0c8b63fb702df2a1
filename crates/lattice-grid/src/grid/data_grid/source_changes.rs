//! Keeping selection and currency attached to their rows while the data
//! source changes.
//!
//! Inserts, removes and moves shift slot-indexed state in place. A reset
//! carries no detail, so state is restored by item identity against the new
//! rows.

use std::sync::Arc;

use lattice_grid_core::CollectionChange;
use lattice_grid_core::logging::targets;

use super::DataGrid;
use crate::grid::data::DataSource;
use crate::grid::events::CellCoordinate;
use crate::grid::message::GridMessage;
use crate::grid::slots::SlotLayout;
use crate::model::GridItem;

impl<T: GridItem> DataGrid<T> {
    /// Replace the data source.
    ///
    /// Selection is cleared; currency adopts the collection view's current
    /// position when it has one.
    pub fn set_data_source(&mut self, source: Option<DataSource<T>>) {
        self.source_connections.clear();
        let dropped = self
            .inbox
            .discard(|m| m.is_data_change() || matches!(m, GridMessage::CurrentChanged(_)));

        let scope = self.begin_change();
        self.clear_selection_state();
        self.current = CellCoordinate::none();
        self.source = source;
        self.rows = self.source.as_ref().map(|s| s.rows()).unwrap_or_default();
        self.layout = self.fresh_layout();
        self.adapter
            .set_source(self.source.as_ref().map(|s| s.item_source()));
        if let Some(estimator) = self.estimator.as_mut() {
            estimator.on_data_source_changed(self.layout.slot_count());
        }
        self.viewport.set_offset(0.0);
        self.anchor_hint = None;
        self.anchor_hint_token.invalidate();
        self.last_anchor = None;

        if let Some(source) = &self.source {
            self.source_connections = source.connect(&self.inbox.sender(), &self.syncing_currency);
            let current = source
                .collection_view()
                .and_then(|view| view.current_position())
                .and_then(|row| self.layout.slot_from_row_index(row));
            if current.is_some() {
                self.current = CellCoordinate::new(self.coerce_column(None), current);
            }
        }
        tracing::debug!(
            target: targets::DATA,
            rows = self.rows.len(),
            dropped,
            "data source replaced"
        );
        self.end_change(scope);
    }

    /// An ungrouped layout over the current rows.
    fn fresh_layout(&self) -> SlotLayout {
        let mut layout = SlotLayout::new(self.rows.len());
        layout.set_selection_offset(self.source.as_ref().map_or(0, |s| s.page_start()));
        layout
    }

    pub(crate) fn on_source_changed(&mut self, change: CollectionChange<T>) {
        match change {
            CollectionChange::Add { index, items } => self.on_rows_inserted(index, items),
            CollectionChange::Remove { index, items } => self.on_rows_removed(index, items.len()),
            CollectionChange::Replace {
                index,
                old_items,
                new_items,
            } => {
                let scope = self.begin_change();
                self.on_rows_removed(index, old_items.len());
                self.on_rows_inserted(index, new_items);
                self.end_change(scope);
            }
            CollectionChange::Move {
                old_index,
                new_index,
                ..
            } => self.on_row_moved(old_index, new_index),
            CollectionChange::Reset => self.on_source_reset(),
        }
    }

    fn on_rows_inserted(&mut self, row: usize, items: Vec<T>) {
        let count = items.len();
        if count == 0 {
            return;
        }
        let row = row.min(self.rows.len());
        let scope = self.begin_change();

        self.rows.splice(row..row, items);
        let slot = self.layout.insert_rows(row, count);
        self.selected_items.insert_slots(slot, count);
        let selectable = self.columns.selectable_indexes();
        self.cells
            .insert_rows(row, count, &selectable, self.rows.len());
        self.adapter
            .items_inserted(row + self.layout.selection_offset(), count);
        if let Some(estimator) = self.estimator.as_mut() {
            estimator.on_items_inserted(slot, count);
        }

        let shift = |s: usize| if s >= slot { s + count } else { s };
        self.current.slot = self.current.slot.map(shift);
        self.anchor_slot = self.anchor_slot.map(shift);

        tracing::trace!(target: targets::DATA, row, count, "rows inserted");
        self.end_change(scope);
    }

    fn on_rows_removed(&mut self, row: usize, count: usize) {
        let end = (row + count).min(self.rows.len());
        if row >= end {
            return;
        }
        let count = end - row;
        let scope = self.begin_change();

        let removed: Vec<(usize, T)> = (row..end)
            .filter_map(|r| Some((self.layout.slot_from_row_index(r)?, self.rows.get(r)?.clone())))
            .collect();
        let item_at = |slot: usize| {
            removed
                .iter()
                .find(|(s, _)| *s == slot)
                .map(|(_, item)| item.clone())
        };

        let runs = self.layout.remove_rows(row, count);
        for &(slot, len) in &runs {
            self.selected_items.remove_slots(slot, len, &item_at);
            if let Some(estimator) = self.estimator.as_mut() {
                estimator.on_items_removed(slot, len);
            }
        }
        self.rows.drain(row..end);
        let selectable = self.columns.selectable_indexes();
        self.cells
            .remove_rows(row, count, &selectable, self.rows.len());
        self.adapter
            .items_removed(row + self.layout.selection_offset(), count);

        let current_removed = self
            .current
            .slot
            .is_some_and(|slot| shift_for_removal(slot, &runs).is_none());
        if current_removed {
            let nearest = row.min(self.rows.len().saturating_sub(1));
            self.current.slot = self
                .layout
                .slot_from_row_index(nearest)
                .filter(|&s| !self.layout.is_collapsed(s));
        } else {
            self.current.slot = self
                .current
                .slot
                .and_then(|slot| shift_for_removal(slot, &runs));
        }
        self.anchor_slot = self
            .anchor_slot
            .and_then(|slot| shift_for_removal(slot, &runs));

        tracing::trace!(target: targets::DATA, row, count, "rows removed");
        self.end_change(scope);
    }

    fn on_row_moved(&mut self, old_row: usize, new_row: usize) {
        if old_row >= self.rows.len() || new_row >= self.rows.len() || old_row == new_row {
            return;
        }
        let scope = self.begin_change();

        let move_row = |r: usize| {
            if r == old_row {
                return new_row;
            }
            let without = if r > old_row { r - 1 } else { r };
            if without >= new_row { without + 1 } else { without }
        };
        let old_slot = self.layout.slot_from_row_index(old_row);
        let new_slot = self.layout.slot_from_row_index(new_row);

        let layout = &self.layout;
        let rows = &self.rows;
        let map = |slot: usize| {
            layout
                .row_index_from_slot(slot)
                .and_then(|r| layout.slot_from_row_index(move_row(r)))
        };
        self.selected_items.remap(&map, |slot| {
            layout.row_index_from_slot(slot).and_then(|r| rows.get(r).cloned())
        });
        self.current.slot = self.current.slot.and_then(&map);
        self.anchor_slot = self.anchor_slot.and_then(&map);

        let item = self.rows.remove(old_row);
        self.rows.insert(new_row, item);
        let selectable = self.columns.selectable_indexes();
        self.cells
            .move_row(old_row, new_row, &selectable, self.rows.len());
        let offset = self.layout.selection_offset();
        self.adapter.item_moved(old_row + offset, new_row + offset);
        if let (Some(estimator), Some(old_slot), Some(new_slot)) =
            (self.estimator.as_mut(), old_slot, new_slot)
        {
            estimator.on_items_removed(old_slot, 1);
            estimator.on_items_inserted(new_slot, 1);
        }

        tracing::trace!(target: targets::DATA, old_row, new_row, "row moved");
        self.end_change(scope);
    }

    /// Reload everything and restore selection and currency by identity.
    ///
    /// Row grouping does not survive a reset.
    fn on_source_reset(&mut self) {
        let scope = self.begin_change();

        let current_item = self.current_item();
        let anchor_item = self.anchor_slot.and_then(|slot| self.item_at_slot(slot));
        let primary_item = self.selected_item.get();

        let old_rows = std::mem::take(&mut self.rows);
        self.rows = self.source.as_ref().map(|s| s.rows()).unwrap_or_default();
        let fresh = self.fresh_layout();
        let old_layout = std::mem::replace(&mut self.layout, fresh);

        {
            let rows = &self.rows;
            let layout = &self.layout;
            let find_row = |old_row: usize| {
                let item = old_rows.get(old_row)?;
                rows.iter().position(|r| r == item)
            };
            let map = |slot: usize| {
                old_layout
                    .row_index_from_slot(slot)
                    .and_then(&find_row)
                    .and_then(|row| layout.slot_from_row_index(row))
            };
            let item_at = |slot: usize| {
                old_layout
                    .row_index_from_slot(slot)
                    .and_then(|row| old_rows.get(row).cloned())
            };
            self.selected_items.remap(map, item_at);
            let selectable = self.columns.selectable_indexes();
            self.cells.remap(&find_row, Some, &selectable, rows.len());
        }

        // The model's indexes are meaningless after a reset: reselect the
        // last flushed items wherever they landed.
        self.adapter.source_reset();
        if let Some(source) = self.source.as_ref().map(|s| s.item_source()) {
            let indexes: Vec<usize> = self
                .model_snapshot
                .iter()
                .filter_map(|item| source.index_of(item))
                .collect();
            let primary = primary_item.and_then(|item| source.index_of(&item));
            if !indexes.is_empty() {
                self.adapter.replace_selection(&indexes, primary);
            }
        }

        // The push above is not echoed back, and rows that were off the old
        // page had no slots to remap: take the row selection from the model.
        let model = Arc::clone(self.adapter.model());
        let source_len = model.source().map_or(0, |s| s.len());
        let slots = self.displayed_slots_of(&model.selected_indexes(), source_len);
        self.selected_items.replace_with(slots);
        if self.options.selection_unit.is_cell_based() {
            self.sync_cells_from_rows();
        }

        self.current.slot = current_item.and_then(|item| self.slot_of_item(&item));
        if self.current.slot.is_none() {
            self.current.column = None;
        }
        self.anchor_slot = anchor_item.and_then(|item| self.slot_of_item(&item));
        if let Some(estimator) = self.estimator.as_mut() {
            estimator.on_data_source_changed(self.layout.slot_count());
        }

        tracing::debug!(
            target: targets::DATA,
            rows = self.rows.len(),
            selected = self.selected_items.len(),
            "source reset"
        );
        self.end_change(scope);
    }
}

/// Where a slot lands after the removal runs, or `None` if it was removed.
///
/// `runs` are `(slot, len)` in pre-removal coordinates.
fn shift_for_removal(slot: usize, runs: &[(usize, usize)]) -> Option<usize> {
    let mut removed_before = 0;
    for &(start, len) in runs {
        if (start..start + len).contains(&slot) {
            return None;
        }
        if start + len <= slot {
            removed_before += len;
        }
    }
    Some(slot - removed_before)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_for_removal() {
        let runs = [(8, 2), (3, 2)];
        assert_eq!(shift_for_removal(1, &runs), Some(1));
        assert_eq!(shift_for_removal(3, &runs), None);
        assert_eq!(shift_for_removal(6, &runs), Some(4));
        assert_eq!(shift_for_removal(9, &runs), None);
        assert_eq!(shift_for_removal(12, &runs), Some(8));
    }
}
