//! Scroll preservation across hierarchy changes.
//!
//! When rows appear or disappear above the viewport, the rows the user is
//! looking at would jump. Before applying a hierarchy change the grid picks an
//! anchor row and records where it sits; after the change it translates the
//! anchor through the change's [`FlattenedIndexMap`] and requests the scroll
//! offset that puts the row back in the same place.
//!
//! [`FlattenedIndexMap`]: crate::model::FlattenedIndexMap

use std::sync::Arc;

use lattice_grid_core::logging::{span_names, targets};

use super::DataGrid;
use crate::grid::slots::SlotLayout;
use crate::model::{FlattenedChange, FlattenedChangedArgs, GridItem, HierarchicalModel};

/// Where an anchor row was before a hierarchy change, and where it went.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HierarchicalAnchor {
    /// Flattened row index before the change.
    pub old_row_index: usize,
    /// Flattened row index after the change.
    pub new_row_index: Option<usize>,
    /// The row's distance from the viewport's top edge.
    pub viewport_offset: f64,
    /// The viewport's scroll offset before the change.
    pub content_offset: f64,
    /// The row's estimated content offset before the change.
    pub estimated_old_base_offset: f64,
}

impl<T: GridItem> DataGrid<T> {
    /// Name the row the next hierarchy change should keep in place.
    ///
    /// Call this right before a user action that expands or collapses a
    /// node. The hint expires on the next [`run_deferred`] if no change
    /// consumed it.
    ///
    /// [`run_deferred`]: Self::run_deferred
    pub fn prepare_hierarchical_anchor(&mut self, slot: usize) {
        self.anchor_hint = Some(slot);
        let ticket = self.anchor_hint_token.next();
        self.tasks.post(move |grid: &mut DataGrid<T>| {
            if grid.anchor_hint_token.is_current(ticket) && grid.anchor_hint.take().is_some() {
                tracing::trace!(target: targets::ANCHOR, slot, "unused anchor hint expired");
            }
        });
    }

    /// Expand or collapse the node displayed at `slot`, keeping it in place.
    ///
    /// Returns `true` if the node's state changed. The rows update on the next
    /// [`dispatch_pending`].
    ///
    /// [`dispatch_pending`]: Self::dispatch_pending
    pub fn toggle_expanded_at(&mut self, slot: usize) -> bool {
        let Some(model) = self.source.as_ref().and_then(|s| s.hierarchy()).cloned() else {
            return false;
        };
        let Some(node) = self
            .layout
            .row_index_from_slot(slot)
            .and_then(|row| model.node_at(row))
        else {
            return false;
        };
        if !model.has_children(node) {
            return false;
        }
        self.prepare_hierarchical_anchor(slot);
        model.toggle(node)
    }

    /// The anchor used by the last hierarchy change.
    pub fn last_anchor(&self) -> Option<HierarchicalAnchor> {
        self.last_anchor
    }

    pub(crate) fn on_hierarchy_changed(&mut self, args: FlattenedChangedArgs) {
        let Some(model) = self.source.as_ref().and_then(|s| s.hierarchy()).cloned() else {
            return;
        };
        let _span = tracing::debug_span!(
            target: targets::ANCHOR,
            span_names::HIERARCHY_CHANGE,
            changes = args.changes.len()
        )
        .entered();

        let anchor = self.capture_anchor(&model, &args.changes);
        self.update_estimator(&args.changes);
        self.remap_through(&model, &args);
        self.restore_anchor(anchor, &args);
    }

    /// Pick the row to keep in place: the hinted row, else the parent of the
    /// first change when its expansion state explains the change, else the
    /// first displayed row.
    fn capture_anchor(
        &mut self,
        model: &HierarchicalModel<T>,
        changes: &[FlattenedChange],
    ) -> Option<HierarchicalAnchor> {
        self.anchor_hint_token.invalidate();
        let hinted = self
            .anchor_hint
            .take()
            .and_then(|slot| self.layout.row_index_from_slot(slot));

        let displayed = self.displayed_slots();
        let parent = changes.first().and_then(|change| {
            let row = change.index.checked_sub(1)?;
            let slot = self.layout.slot_from_row_index(row)?;
            if !displayed.contains(&slot) {
                return None;
            }
            let node = self.rows.get(row).and_then(|item| model.find_node(item))?;
            let expanded = model.is_expanded(node);
            let consistent = (change.delta() > 0 && expanded) || (change.delta() < 0 && !expanded);
            consistent.then_some(row)
        });
        let first_displayed = || {
            displayed
                .clone()
                .find(|&slot| !self.layout.is_collapsed(slot))
                .and_then(|slot| self.layout.row_index_from_slot(slot))
        };

        let row = hinted.or(parent).or_else(first_displayed)?;
        let slot = self.layout.slot_from_row_index(row)?;
        let base = self.estimate_offset(slot);
        let anchor = HierarchicalAnchor {
            old_row_index: row,
            new_row_index: None,
            viewport_offset: base - self.viewport.offset(),
            content_offset: self.viewport.offset(),
            estimated_old_base_offset: base,
        };
        tracing::debug!(
            target: targets::ANCHOR,
            row,
            hinted = hinted.is_some(),
            base,
            "hierarchical anchor captured"
        );
        Some(anchor)
    }

    /// Apply the changes to the estimator, in ascending order so each index
    /// is already in the estimator's current coordinates.
    fn update_estimator(&mut self, changes: &[FlattenedChange]) {
        let Some(estimator) = self.estimator.as_mut() else {
            return;
        };
        let mut shift: isize = 0;
        for change in changes {
            let index = (change.index as isize + shift).max(0) as usize;
            if change.old_count > 0 {
                estimator.on_items_removed(index, change.old_count);
            }
            if change.new_count > 0 {
                estimator.on_items_inserted(index, change.new_count);
            }
            shift += change.delta();
        }
    }

    /// Move selection, cells, model indexes, currency and the range anchor
    /// through the change's index map, then take the new rows.
    fn remap_through(&mut self, model: &Arc<HierarchicalModel<T>>, args: &FlattenedChangedArgs) {
        let map = &args.index_map;
        let new_rows = model.flattened_items();
        let new_len = new_rows.len();
        let scope = self.begin_change();

        {
            let layout = &self.layout;
            let rows = &self.rows;
            let slot_map = |slot: usize| {
                layout
                    .row_index_from_slot(slot)
                    .and_then(|row| map.map_old_to_new(row))
            };
            let item_at = |slot: usize| {
                layout
                    .row_index_from_slot(slot)
                    .and_then(|row| rows.get(row).cloned())
            };
            let dropped = self.selected_items.remap(&slot_map, item_at);
            if dropped > 0 {
                tracing::debug!(
                    target: targets::ANCHOR,
                    dropped,
                    "selected rows hidden by hierarchy change"
                );
            }
            self.current.slot = self
                .current
                .slot
                .and_then(|slot| layout.row_index_from_slot(slot))
                .and_then(|row| map.map_old_to_nearest(row, new_len));
            self.anchor_slot = self.anchor_slot.and_then(&slot_map);
        }
        let selectable = self.columns.selectable_indexes();
        self.cells
            .remap(|row| map.map_old_to_new(row), Some, &selectable, new_len);

        let selection = self.adapter.model();
        let indexes: Vec<usize> = selection
            .selected_indexes()
            .into_iter()
            .filter_map(|index| map.map_old_to_new(index))
            .collect();
        let primary = selection
            .selected_index()
            .and_then(|index| map.map_old_to_new(index));
        let source = self.source.as_ref().map(|s| s.item_source());
        self.adapter.reattach_with(source, &indexes, primary);

        self.rows = new_rows;
        self.layout = SlotLayout::new(new_len);
        self.end_change(scope);
    }

    /// Request the scroll offset that keeps the anchor in place.
    ///
    /// Changes strictly after the anchor leave the offset alone.
    fn restore_anchor(&mut self, anchor: Option<HierarchicalAnchor>, args: &FlattenedChangedArgs) {
        let Some(mut anchor) = anchor else {
            self.last_anchor = None;
            return;
        };
        anchor.new_row_index = args
            .index_map
            .map_old_to_nearest(anchor.old_row_index, self.rows.len());

        let affects_anchor = args
            .changes
            .iter()
            .any(|change| change.index <= anchor.old_row_index);
        if affects_anchor && let Some(row) = anchor.new_row_index {
            let new_base = self
                .layout
                .slot_from_row_index(row)
                .map_or(0.0, |slot| self.estimate_offset(slot));
            let offset = anchor.content_offset + (new_base - anchor.estimated_old_base_offset);
            self.viewport.set_pending_offset(offset);
            tracing::debug!(
                target: targets::ANCHOR,
                old_row = anchor.old_row_index,
                new_row = row,
                offset,
                "scroll offset restored"
            );
        }
        self.last_anchor = Some(anchor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::data::DataSource;
    use crate::model::{AverageRowHeightEstimator, NodeKey};

    /// A root with `children` leaves, expanded, followed by `tail` roots.
    fn tree(children: usize, tail: usize) -> (Arc<HierarchicalModel<String>>, NodeKey) {
        let model = Arc::new(HierarchicalModel::new());
        let root = model.add_root("root".to_string());
        for i in 0..children {
            model.add_child(root, format!("child{i}"));
        }
        for i in 0..tail {
            model.add_root(format!("tail{i}"));
        }
        model.expand(root);
        (model, root)
    }

    #[test]
    fn test_hint_expires_when_unused() {
        let mut grid: DataGrid<String> = DataGrid::new();
        grid.prepare_hierarchical_anchor(3);
        assert_eq!(grid.anchor_hint, Some(3));
        grid.run_deferred();
        assert_eq!(grid.anchor_hint, None);
    }

    #[test]
    fn test_newer_hint_survives_older_expiry() {
        let mut grid: DataGrid<String> = DataGrid::new();
        grid.prepare_hierarchical_anchor(3);
        grid.prepare_hierarchical_anchor(5);
        // Both expiry tasks run; only the second ticket is current.
        grid.run_deferred();
        assert_eq!(grid.anchor_hint, None);
    }

    #[test]
    fn test_toggled_row_stays_in_place() {
        let (model, _) = tree(5, 3);
        let mut grid = DataGrid::new().with_data_source(DataSource::from(Arc::clone(&model)));
        grid.set_viewport(0.0, 220.0);
        assert_eq!(grid.row_count(), 9);

        assert!(grid.toggle_expanded_at(0));
        grid.dispatch_pending();

        assert_eq!(grid.row_count(), 4);
        let anchor = grid.last_anchor().unwrap();
        assert_eq!(anchor.old_row_index, 0);
        assert_eq!(anchor.new_row_index, Some(0));
        // The change starts below the anchor.
        assert_eq!(grid.pending_scroll_offset(), None);
    }

    #[test]
    fn test_collapse_above_viewport_keeps_top_row() {
        let (model, root) = tree(10, 60);
        let mut grid = DataGrid::new().with_data_source(DataSource::from(Arc::clone(&model)));
        let h = grid.options().row_height_estimate;
        grid.set_viewport(50.0 * h, 10.0 * h);

        model.collapse(root);
        grid.dispatch_pending();

        let anchor = grid.last_anchor().unwrap();
        assert_eq!(anchor.old_row_index, 50);
        assert_eq!(anchor.new_row_index, Some(40));
        assert_eq!(grid.pending_scroll_offset(), Some(40.0 * h));
    }

    #[test]
    fn test_collapse_above_viewport_uses_measured_heights() {
        let (model, root) = tree(10, 60);
        let mut grid = DataGrid::new()
            .with_data_source(DataSource::from(Arc::clone(&model)))
            .with_row_height_estimator(Box::new(AverageRowHeightEstimator::new(20.0)));
        // The root and its children are twice as tall as the tail rows.
        for slot in 0..=10 {
            grid.record_row_height(slot, 40.0);
        }
        for slot in 11..71 {
            grid.record_row_height(slot, 20.0);
        }
        let top = grid.estimate_offset(50);
        assert_eq!(top, 11.0 * 40.0 + 39.0 * 20.0);
        grid.set_viewport(top, 200.0);

        model.collapse(root);
        grid.dispatch_pending();

        let anchor = grid.last_anchor().unwrap();
        assert_eq!(anchor.old_row_index, 50);
        assert_eq!(anchor.new_row_index, Some(40));
        assert_eq!(anchor.estimated_old_base_offset, top);
        // The hidden children took their measurements with them.
        assert_eq!(grid.estimate_height(0), 40.0);
        assert_eq!(grid.estimate_height(1), 20.0);
        assert_eq!(grid.estimate_offset(40), 40.0 + 39.0 * 20.0);

        assert_eq!(grid.pending_scroll_offset(), Some(820.0));
        assert_eq!(grid.arrange(), Some(820.0));
        assert_eq!(grid.viewport().offset(), 820.0);
        assert_eq!(grid.displayed_slots().start, 40);
        assert_eq!(grid.arrange(), None);
    }

    #[test]
    fn test_selection_follows_rows_through_collapse() {
        let (model, root) = tree(3, 2);
        let mut grid = DataGrid::new().with_data_source(DataSource::from(Arc::clone(&model)));
        // rows: root, child0..2, tail0, tail1
        assert!(grid.set_selected_index(Some(4)));
        model.collapse(root);
        grid.dispatch_pending();

        assert_eq!(grid.selected_items(), vec!["tail0".to_string()]);
        assert_eq!(grid.selected_index(), Some(1));
        assert_eq!(grid.selection_model().selected_indexes(), vec![1]);
        assert_eq!(grid.current_cell().slot, Some(1));
    }
}
