//! Pulling selection-model state into the grid, and swapping models.

use std::sync::Arc;

use lattice_grid_core::logging::{span_names, targets};

use super::DataGrid;
use crate::error::{GridError, Result};
use crate::grid::adapter::SelectionModelAdapter;
use crate::grid::events::CellCoordinate;
use crate::grid::selection::SelectionMode;
use crate::model::{GridItem, SelectionModel};

impl<T: GridItem> DataGrid<T> {
    /// The attached selection model.
    pub fn selection_model(&self) -> &Arc<dyn SelectionModel<T>> {
        self.adapter.model()
    }

    /// Attach a selection model, or a fresh default one for `None`.
    ///
    /// The grid adopts the model's selection. Fails if the model is already
    /// attached to a grid; the current model stays attached in that case.
    pub fn set_selection_model(&mut self, model: Option<Arc<dyn SelectionModel<T>>>) -> Result<()> {
        let single_select = self.options.selection_mode == SelectionMode::Single;
        let adapter = match model {
            Some(model) if Arc::ptr_eq(&model, self.adapter.model()) => return Ok(()),
            Some(model) => {
                if model.is_attached() {
                    return Err(GridError::SelectionModelAttached);
                }
                SelectionModelAdapter::attach(model, false, self.inbox.sender())?
            }
            None => SelectionModelAdapter::with_default_model(single_select, self.inbox.sender()),
        };

        // The old adapter detaches when dropped here.
        self.adapter = adapter;
        let dropped = self.inbox.discard(|m| m.is_model_change());
        tracing::debug!(
            target: targets::ADAPTER,
            owned = self.adapter.is_owned(),
            dropped,
            "selection model replaced"
        );

        if single_select {
            self.adapter.set_single_select(true);
        }
        let source = self.source.as_ref().map(|s| s.item_source());
        let same_source = match (&source, self.adapter.model().source()) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, &b),
            (None, None) => true,
            _ => false,
        };
        if !same_source {
            self.adapter.set_source(source);
        }
        self.apply_selection_from_selection_model(None);
        Ok(())
    }

    /// Rebuild the grid's selection from the model's selected indexes.
    ///
    /// Currency moves to `preferred` when given, otherwise to the model's
    /// selected index, otherwise to the first selected slot.
    pub(crate) fn apply_selection_from_selection_model(&mut self, preferred: Option<usize>) {
        let _span = tracing::debug_span!(
            target: targets::SELECTION,
            span_names::APPLY_SELECTION_MODEL,
            preferred
        )
        .entered();
        let Some(_pull) = self.adapter.begin_pull() else {
            return;
        };

        let model = Arc::clone(self.adapter.model());
        let indexes = model.selected_indexes();
        let scope = self.begin_change();

        if model.source().is_none() || indexes.is_empty() {
            self.selected_items.clear();
            self.cells.clear();
            self.anchor_slot = None;
            self.anchor_column = None;
            self.end_change(scope);
            return;
        }

        let slots = self.displayed_slots_of(&indexes, model.source().map_or(0, |s| s.len()));
        self.selected_items.replace_with(slots);

        let primary = model
            .selected_index()
            .and_then(|index| self.layout.slot_from_selection_index(index));
        let target = preferred
            .or(primary)
            .or_else(|| self.selected_items.first_slot())
            .filter(|&slot| !self.layout.is_collapsed(slot));
        if let Some(slot) = target {
            self.current = CellCoordinate::new(self.coerce_column(None), Some(slot));
            self.anchor_slot = Some(slot);
        }

        if self.options.selection_unit.is_cell_based() {
            self.sync_cells_from_rows();
        }
        self.end_change(scope);
    }

    /// Slots showing the selection-model `indexes`; indexes off the page or
    /// hidden by a collapsed ancestor have none.
    pub(super) fn displayed_slots_of(&self, indexes: &[usize], source_len: usize) -> Vec<usize> {
        let mut slots = Vec::with_capacity(indexes.len());
        for &index in indexes {
            match self.layout.slot_from_selection_index(index) {
                Some(slot) => slots.push(slot),
                None if index >= source_len => {
                    tracing::warn!(
                        target: targets::SELECTION,
                        index,
                        source_len,
                        "selected index outside the source"
                    );
                }
                None => {
                    tracing::trace!(
                        target: targets::SELECTION,
                        index,
                        "selected index not displayed"
                    );
                }
            }
        }
        slots
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::grid::data::DataSource;
    use crate::grid::selection::SelectionUnit;
    use crate::model::CollectionView;

    fn grid(n: usize) -> DataGrid<usize> {
        let view = Arc::new(CollectionView::new((0..n).collect()));
        let mut grid = DataGrid::new().with_data_source(DataSource::from(view));
        grid.add_column("A");
        grid.add_column("B");
        grid
    }

    #[test]
    fn test_pull_moves_currency_to_primary() {
        let mut grid = grid(6);
        let model = Arc::clone(grid.selection_model());
        model.select(4);
        model.select(1);
        grid.apply_selection_from_selection_model(None);

        assert_eq!(grid.selected_slots(), vec![1, 4]);
        assert_eq!(grid.current_cell().slot, Some(4));
        assert_eq!(grid.anchor_slot(), Some(4));
    }

    #[test]
    fn test_pull_fills_cells_in_cell_units() {
        let mut grid = grid(3).with_selection_unit(SelectionUnit::CellOrRowHeader);
        grid.selection_model().select(2);
        grid.apply_selection_from_selection_model(None);

        assert!(grid.is_row_header_selected(2));
        assert_eq!(grid.selected_cells().len(), 2);
    }

    #[test]
    fn test_out_of_source_indexes_are_skipped() {
        let mut grid = grid(3);
        // Out-of-range selects are ignored by the model itself.
        grid.selection_model().select(7);
        grid.apply_selection_from_selection_model(None);
        assert!(grid.selected_items().is_empty());
    }

    proptest! {
        #[test]
        fn prop_pull_is_idempotent(
            n in 1usize..40,
            picks in proptest::collection::vec(0usize..40, 0..12),
        ) {
            let mut grid = grid(n);
            let model = Arc::clone(grid.selection_model());
            for index in picks.into_iter().filter(|&i| i < n) {
                model.select(index);
            }

            grid.apply_selection_from_selection_model(None);
            let first = (grid.selected_slots(), grid.current_cell(), grid.anchor_slot());
            grid.apply_selection_from_selection_model(None);
            let second = (grid.selected_slots(), grid.current_cell(), grid.anchor_slot());

            prop_assert_eq!(first, second);
            prop_assert_eq!(grid.selected_slots(), model.selected_indexes());
        }
    }
}
