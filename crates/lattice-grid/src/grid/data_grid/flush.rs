//! Change scopes and the outermost flush.
//!
//! Selection and currency each have a nesting counter. Any operation may
//! open a scope; only the scope that brings a counter back to zero flushes
//! that counter's state. The flush is where events fire and bound lists are
//! written, so a compound operation reports one net delta.

use lattice_grid_core::DeferGuard;
use lattice_grid_core::logging::targets;

use super::DataGrid;
use crate::grid::events::{
    CurrentCellChangedEventArgs, SelectedCellsChangedEventArgs, SelectedColumnsChangedEventArgs,
    SelectionChangedEventArgs,
};
use crate::grid::columns::ColumnId;
use crate::model::GridItem;

/// An open change scope. Close it with [`DataGrid::end_change`].
#[must_use = "a change scope flushes only when passed to end_change"]
pub(crate) struct ChangeScope {
    selection: DeferGuard,
    currency: DeferGuard,
}

impl<T: GridItem> DataGrid<T> {
    /// Open a change scope.
    pub(crate) fn begin_change(&self) -> ChangeScope {
        ChangeScope {
            selection: self.no_selection_change.enter(),
            currency: self.no_current_cell_change.enter(),
        }
    }

    /// Close a change scope, flushing if it was the outermost one.
    pub(crate) fn end_change(&mut self, scope: ChangeScope) {
        let flush_selection = scope.selection.release();
        let flush_currency = scope.currency.release();
        if flush_selection {
            self.flush_selection();
        }
        if flush_currency {
            self.flush_currency();
        }
    }

    /// Returns `true` while a change scope is open.
    pub fn is_changing(&self) -> bool {
        !self.no_selection_change.is_idle()
    }

    fn flush_selection(&mut self) {
        let rows = &self.rows;
        let layout = &self.layout;
        let items = self.selected_items.take_delta(|slot| {
            layout
                .row_index_from_slot(slot)
                .and_then(|row| rows.get(row).cloned())
        });
        let cells = self.cells.take_delta();

        let columns: Vec<ColumnId> = self
            .cells
            .selected_columns()
            .filter_map(|c| self.columns.id_at(c))
            .collect();
        let added_columns: Vec<ColumnId> = columns
            .iter()
            .filter(|id| !self.flushed_columns.contains(id))
            .copied()
            .collect();
        let removed_columns: Vec<ColumnId> = self
            .flushed_columns
            .iter()
            .filter(|id| !columns.contains(id))
            .copied()
            .collect();
        self.flushed_columns = columns;

        self.model_snapshot = self.adapter.model().selected_items();
        let (index, item) = self.primary_selection();

        if let Some(binding) = &self.bindings.items {
            binding.push_delta(&items.added, &items.removed);
        }
        if let Some(binding) = &self.bindings.cells {
            binding.push_delta(&cells.added, &cells.removed);
        }
        if let Some(binding) = &self.bindings.columns {
            binding.push_delta(&added_columns, &removed_columns);
        }

        let changed = !items.is_empty()
            || !cells.is_empty()
            || !added_columns.is_empty()
            || !removed_columns.is_empty();
        if changed {
            self.refresh_visuals();
            tracing::debug!(
                target: targets::SELECTION,
                added = items.added.len(),
                removed = items.removed.len(),
                added_cells = cells.added.len(),
                removed_cells = cells.removed.len(),
                "selection flushed"
            );
        }

        let scroll = self.options.auto_scroll_to_selected && !items.added.is_empty();
        if !items.is_empty() {
            self.selection_changed.emit(SelectionChangedEventArgs {
                added_items: items.added,
                removed_items: items.removed,
            });
        }
        if !cells.is_empty() {
            self.selected_cells_changed.emit(SelectedCellsChangedEventArgs {
                added_cells: cells.added,
                removed_cells: cells.removed,
            });
        }
        if !added_columns.is_empty() || !removed_columns.is_empty() {
            self.selected_columns_changed.emit(SelectedColumnsChangedEventArgs {
                added_columns,
                removed_columns,
            });
        }
        if self.selected_index.replace(index).is_some() {
            self.selected_index_changed.emit(index);
        }
        if self.selected_item.replace(item.clone()).is_some() {
            self.selected_item_changed.emit(item);
        }
        if scroll {
            self.schedule_auto_scroll();
        }
    }

    /// Row index and item of the primary selection: the model's selected
    /// index when it is displayed, otherwise the first selected row.
    fn primary_selection(&self) -> (Option<usize>, Option<T>) {
        let slot = self
            .adapter
            .model()
            .selected_index()
            .and_then(|index| self.layout.slot_from_selection_index(index))
            .filter(|&slot| self.selected_items.contains(slot))
            .or_else(|| self.selected_items.first_slot());
        let row = slot.and_then(|slot| self.layout.row_index_from_slot(slot));
        (row, row.and_then(|row| self.rows.get(row).cloned()))
    }

    fn flush_currency(&mut self) {
        let old = self.flushed_current;
        let new = self.current;
        if old != new {
            self.flushed_current = new;
            self.refresh_visuals();
            tracing::trace!(target: targets::SELECTION, ?old, ?new, "current cell flushed");
            self.current_cell_changed
                .emit(CurrentCellChangedEventArgs { old, new });
        }
        self.sync_view_currency();
    }

    /// Point the collection view's currency at the current row.
    fn sync_view_currency(&self) {
        let Some(view) = self.source.as_ref().and_then(|s| s.collection_view()) else {
            return;
        };
        let row = self
            .current
            .slot
            .and_then(|slot| self.layout.row_index_from_slot(slot));
        if view.current_position() != row {
            let _sync = self.syncing_currency.enter();
            view.move_current_to_position(row);
        }
    }
}
