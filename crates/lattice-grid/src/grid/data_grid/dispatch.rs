//! The grid's single dispatch point.
//!
//! Model, data-source and binding signals only enqueue [`GridMessage`]s. The
//! host drains them with [`DataGrid::dispatch_pending`], usually once per
//! event-loop turn. Draining coalesces what a burst of notifications would
//! otherwise repeat:
//!
//! - a data `Reset` supersedes every other data change in the batch
//! - consecutive hierarchy changes compose into one change list
//! - consecutive model notifications collapse into one pull
//!
//! Deferred work (auto-scroll, pointer-over refresh, anchor hint expiry) sits
//! on a separate task queue run by [`DataGrid::run_deferred`].

use lattice_grid_core::CollectionChange;
use lattice_grid_core::logging::targets;

use super::DataGrid;
use crate::grid::events::CellCoordinate;
use crate::grid::message::GridMessage;
use crate::model::{FlattenedChangedArgs, GridItem};

impl<T: GridItem> DataGrid<T> {
    /// Process every queued notification. Returns the number handled after
    /// coalescing.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut handled = 0;
        // Handling can enqueue more (a bound list echoing a host edit, for
        // example); keep going until the inbox stays empty.
        loop {
            let messages = self.inbox.drain();
            if messages.is_empty() {
                break;
            }
            let received = messages.len();
            let batch = self.coalesce(messages);
            tracing::trace!(
                target: targets::DISPATCH,
                received,
                coalesced = batch.len(),
                "dispatching"
            );
            for message in batch {
                self.handle(message);
                handled += 1;
            }
        }
        handled
    }

    /// Returns `true` if notifications are waiting.
    pub fn has_pending(&self) -> bool {
        !self.inbox.is_empty()
    }

    fn coalesce(&self, messages: Vec<GridMessage<T>>) -> Vec<GridMessage<T>> {
        let last_reset = messages
            .iter()
            .rposition(|m| matches!(m, GridMessage::SourceChanged(CollectionChange::Reset)));

        let mut out: Vec<GridMessage<T>> = Vec::with_capacity(messages.len());
        let mut hierarchy: Option<(usize, FlattenedChangedArgs)> = None;
        // Length of the flattened rows before the pending hierarchy batch.
        let old_len = self.rows.len();
        let mut pulls = false;

        for (position, message) in messages.into_iter().enumerate() {
            match message {
                GridMessage::SourceChanged(_)
                    if last_reset.is_some_and(|last| position != last) => {}
                GridMessage::HierarchyChanged(args) => {
                    hierarchy = Some(match hierarchy.take() {
                        None => (out.len(), args),
                        Some((_, previous)) => {
                            let new_len = self
                                .source
                                .as_ref()
                                .and_then(|s| s.hierarchy())
                                .map_or(0, |h| h.flattened_len());
                            (out.len(), previous.then(&args, old_len, new_len))
                        }
                    });
                    pulls = false;
                }
                message if message.is_model_change() => {
                    if let GridMessage::ModelPropertyChanged(property) = &message {
                        tracing::debug!(
                            target: targets::DISPATCH,
                            ?property,
                            single_select = self.adapter.single_select(),
                            "selection model property changed"
                        );
                    }
                    if !pulls {
                        out.push(GridMessage::ModelSelectionChanged);
                        pulls = true;
                    }
                }
                message => {
                    out.push(message);
                    pulls = false;
                }
            }
        }
        if let Some((position, args)) = hierarchy {
            out.insert(position.min(out.len()), GridMessage::HierarchyChanged(args));
        }
        out
    }

    fn handle(&mut self, message: GridMessage<T>) {
        match message {
            GridMessage::ModelSelectionChanged
            | GridMessage::ModelIndexesChanged
            | GridMessage::ModelLostSelection
            | GridMessage::ModelSourceReset
            | GridMessage::ModelPropertyChanged(_) => {
                self.apply_selection_from_selection_model(None);
            }
            GridMessage::SourceChanged(change) => self.on_source_changed(change),
            GridMessage::HierarchyChanged(args) => self.on_hierarchy_changed(args),
            GridMessage::CurrentChanged(position) => self.on_view_current_changed(position),
            GridMessage::SelectedItemsBinding(change) => {
                self.on_selected_items_list_changed(change);
            }
            GridMessage::SelectedCellsBinding(change) => {
                self.on_selected_cells_list_changed(change);
            }
            GridMessage::SelectedColumnsBinding(change) => {
                self.on_selected_columns_list_changed(change);
            }
        }
    }

    /// The collection view's currency moved on its own: follow it without
    /// touching the selection.
    fn on_view_current_changed(&mut self, position: Option<usize>) {
        match position.and_then(|row| self.layout.slot_from_row_index(row)) {
            Some(slot) => {
                self.set_current_cell(None, Some(slot));
            }
            None => {
                if self.current != CellCoordinate::none() {
                    self.set_current_cell(None, None);
                }
            }
        }
    }

    // =========================================================================
    // Deferred Work
    // =========================================================================

    /// Run the deferred tasks queued so far. Returns the number run.
    ///
    /// Tasks posted while running wait for the next call.
    pub fn run_deferred(&mut self) -> usize {
        let batch = self.tasks.take_batch();
        batch.run(self)
    }

    /// Returns `true` if deferred tasks are waiting.
    pub fn has_deferred(&self) -> bool {
        self.tasks.has_pending()
    }

    /// Queue a scroll to the selection. Only the latest request runs.
    pub(crate) fn schedule_auto_scroll(&mut self) {
        let ticket = self.auto_scroll_token.next();
        self.tasks.post(move |grid: &mut DataGrid<T>| {
            if grid.auto_scroll_token.is_current(ticket) {
                grid.scroll_to_selection();
            }
        });
    }

    /// Record the pointer position. The pointer-over row updates on the next
    /// [`run_deferred`](Self::run_deferred).
    pub fn set_pointer_position(&mut self, y: Option<f64>) {
        self.pointer_y = y;
        let ticket = self.pointer_token.next();
        self.tasks.post(move |grid: &mut DataGrid<T>| {
            if grid.pointer_token.is_current(ticket) {
                grid.refresh_pointer_over();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::grid::data::DataSource;
    use crate::grid::selection::SelectionGesture;
    use crate::model::{
        AverageRowHeightEstimator, CollectionView, FlattenedChange, HierarchicalModel,
    };

    fn grid(n: usize) -> (DataGrid<usize>, Arc<CollectionView<usize>>) {
        let view = Arc::new(CollectionView::new((0..n).collect()));
        let grid = DataGrid::new().with_data_source(DataSource::from(Arc::clone(&view)));
        (grid, view)
    }

    #[test]
    fn test_reset_supersedes_other_data_changes() {
        let (grid, view) = grid(5);
        view.push(5);
        view.reset((0..3).collect());
        view.push(9);

        let batch = grid.coalesce(grid.inbox.drain());
        let data: Vec<_> = batch.iter().filter(|m| m.is_data_change()).collect();
        assert_eq!(data.len(), 1);
        assert!(matches!(data[0], GridMessage::SourceChanged(CollectionChange::Reset)));
    }

    #[test]
    fn test_model_notifications_collapse() {
        let (grid, _) = grid(5);
        let model = Arc::clone(grid.selection_model());
        model.select(1);
        model.select(2);
        model.deselect(1);

        let batch = grid.coalesce(grid.inbox.drain());
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_model_switching_to_single_select_narrows_grid() {
        let (mut grid, _) = grid(5);
        grid.add_column("Value");
        grid.click_cell(1, None, SelectionGesture::plain());
        grid.click_cell(3, None, SelectionGesture::ctrl());
        assert_eq!(grid.selected_slots(), vec![1, 3]);

        let model = Arc::clone(grid.selection_model());
        model.set_single_select(true);
        let batch = grid.coalesce(grid.inbox.drain());
        assert_eq!(batch.len(), 1);
        for message in batch {
            grid.handle(message);
        }

        assert_eq!(grid.selected_slots(), vec![1]);
        assert_eq!(model.selected_indexes(), vec![1]);
        grid.select_all();
        assert_eq!(grid.selected_slots(), vec![1]);
    }

    #[test]
    fn test_dispatch_applies_external_model_changes() {
        let (mut grid, _) = grid(5);
        let model = Arc::clone(grid.selection_model());
        model.select(3);
        assert!(grid.selected_items().is_empty());

        grid.dispatch_pending();
        assert_eq!(grid.selected_items(), vec![3]);
        assert_eq!(grid.current_cell().slot, Some(3));
        assert!(!grid.has_pending());
    }

    #[test]
    fn test_coalesced_toggles_keep_measured_heights() {
        let model = Arc::new(HierarchicalModel::new());
        let a = model.add_root("a".to_string());
        let b = model.add_root("b".to_string());
        for i in 0..3 {
            model.add_child(a, format!("a{i}"));
            model.add_child(b, format!("b{i}"));
        }
        model.add_root("t".to_string());
        model.expand(a);
        model.expand(b);
        let mut grid = DataGrid::new()
            .with_data_source(DataSource::from(Arc::clone(&model)))
            .with_row_height_estimator(Box::new(AverageRowHeightEstimator::new(20.0)));
        grid.dispatch_pending();
        // rows: a, a0..a2, b, b0..b2, t
        assert_eq!(grid.row_count(), 9);
        grid.record_row_height(0, 35.0);
        grid.record_row_height(4, 50.0);
        grid.record_row_height(8, 30.0);

        model.collapse(a);
        model.collapse(b);
        let batch = grid.coalesce(grid.inbox.drain());
        let Some(GridMessage::HierarchyChanged(args)) = batch.first() else {
            panic!("expected one hierarchy change, got {batch:?}");
        };
        assert_eq!(
            args.changes,
            vec![FlattenedChange::removed(1, 3), FlattenedChange::removed(5, 3)]
        );
        for message in batch {
            grid.handle(message);
        }

        assert_eq!(grid.rows().to_vec(), vec!["a", "b", "t"]);
        assert_eq!(grid.estimate_height(0), 35.0);
        assert_eq!(grid.estimate_height(1), 50.0);
        assert_eq!(grid.estimate_height(2), 30.0);
    }

    #[test]
    fn test_view_currency_moves_grid_currency() {
        let (mut grid, view) = grid(5);
        grid.add_column("Value");
        view.move_current_to_position(Some(2));
        grid.dispatch_pending();
        assert_eq!(grid.current_cell(), CellCoordinate::new(Some(0), Some(2)));
        assert!(grid.selected_items().is_empty());
    }

    #[test]
    fn test_grid_currency_does_not_echo() {
        let (mut grid, view) = grid(5);
        assert!(grid.set_current_cell(None, Some(4)));
        assert_eq!(view.current_position(), Some(4));
        assert!(!grid.has_pending());
    }

    #[test]
    fn test_auto_scroll_coalesces() {
        let (grid, _) = grid(50);
        let mut grid = grid.with_auto_scroll_to_selected(true);
        grid.set_viewport(0.0, 100.0);
        assert!(grid.set_selected_index(Some(10)));
        assert!(grid.set_selected_index(Some(30)));
        assert!(grid.has_deferred());
        assert_eq!(grid.run_deferred(), 2);

        let h = grid.options().row_height_estimate;
        assert!(grid.viewport().bottom() >= 31.0 * h);
        assert!(grid.viewport().offset() <= 30.0 * h);
    }
}
