//! Viewport, offset estimation and per-row visual state.
//!
//! Offsets come from the installed [`RowHeightEstimator`], or from the
//! uniform `row_height_estimate` with collapsed slots taking no space.
//! Visual state is only kept for the displayed slots, so a refresh costs
//! the viewport's row count regardless of the data size.
//!
//! [`RowHeightEstimator`]: crate::model::RowHeightEstimator

use std::ops::Range;

use lattice_grid_core::logging::targets;

use super::DataGrid;
use crate::grid::viewport::{RowVisualState, Viewport};
use crate::model::GridItem;

impl<T: GridItem> DataGrid<T> {
    // =========================================================================
    // Viewport
    // =========================================================================

    /// The viewport.
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Scroll and resize the viewport.
    pub fn set_viewport(&mut self, offset: f64, height: f64) {
        self.viewport.set_height(height);
        self.viewport.set_offset(offset);
        self.refresh_visuals();
    }

    /// Scroll offset requested by the last hierarchy change, not yet applied.
    pub fn pending_scroll_offset(&self) -> Option<f64> {
        self.viewport.pending_offset()
    }

    /// Layout pass: apply a requested scroll offset. Returns the offset
    /// applied, if any.
    pub fn arrange(&mut self) -> Option<f64> {
        let offset = self.viewport.take_pending_offset()?;
        self.viewport.set_offset(offset);
        self.refresh_visuals();
        Some(offset)
    }

    /// Slots intersecting the viewport, including collapsed slots between
    /// them.
    pub fn displayed_slots(&self) -> Range<usize> {
        let slot_count = self.layout.slot_count();
        if self.viewport.height() <= 0.0 || slot_count == 0 {
            return 0..0;
        }
        let Some(first) = self.slot_at_offset(self.viewport.offset()) else {
            return 0..0;
        };
        let bottom = self.viewport.bottom();
        let mut end = first + 1;
        while end < slot_count && self.estimate_offset(end) < bottom {
            end += 1;
        }
        first..end
    }

    /// Scroll `slot` into view, through the scroll host when one is
    /// installed. Returns `false` if it could not be shown.
    pub fn scroll_into_view(&mut self, slot: usize, column: Option<usize>) -> bool {
        if let Some(host) = self.scroll_host.as_mut() {
            return host.scroll_into_view(slot, column);
        }
        if slot >= self.layout.slot_count() || self.layout.is_collapsed(slot) {
            return false;
        }
        let top = self.estimate_offset(slot);
        let bottom = top + self.estimate_height(slot);
        if self.viewport.ensure_visible(top, bottom) {
            self.refresh_visuals();
        }
        true
    }

    /// Scroll the primary selection into view.
    pub fn scroll_to_selection(&mut self) -> bool {
        let slot = self
            .selected_index
            .get()
            .and_then(|row| self.layout.slot_from_row_index(row))
            .or_else(|| self.selected_items.first_slot());
        match slot {
            Some(slot) => self.scroll_into_view(slot, self.current.column),
            None => false,
        }
    }

    // =========================================================================
    // Estimation
    // =========================================================================

    /// Estimated content offset of `slot`'s top edge.
    pub fn estimate_offset(&self, slot: usize) -> f64 {
        match &self.estimator {
            Some(estimator) => estimator.estimate_offset(slot),
            None => {
                let visible = slot - self.layout.collapsed_before(slot);
                visible as f64 * self.options.row_height_estimate
            }
        }
    }

    /// Estimated height of `slot`.
    pub fn estimate_height(&self, slot: usize) -> f64 {
        match &self.estimator {
            Some(estimator) => estimator.estimate_height(slot),
            None if self.layout.is_collapsed(slot) => 0.0,
            None => self.options.row_height_estimate,
        }
    }

    /// Slot at a content offset.
    pub fn slot_at_offset(&self, offset: f64) -> Option<usize> {
        match &self.estimator {
            Some(estimator) => estimator.slot_at_offset(offset),
            None => {
                let n = (offset.max(0.0) / self.options.row_height_estimate).floor() as usize;
                self.layout.nth_visible_slot(n)
            }
        }
    }

    /// Report a realized row's measured height.
    pub fn record_row_height(&mut self, slot: usize, height: f64) {
        if let Some(estimator) = self.estimator.as_mut() {
            estimator.record_measured(slot, height);
        }
    }

    // =========================================================================
    // Visual State
    // =========================================================================

    /// Recompute the visual state of the displayed rows.
    pub(crate) fn refresh_visuals(&mut self) {
        let displayed = self.displayed_slots();
        self.row_states.clear();
        for slot in displayed {
            if self.layout.is_collapsed(slot) {
                continue;
            }
            let state = RowVisualState {
                is_selected: self.selected_items.contains(slot),
                is_current: self.current.slot == Some(slot),
                is_group_header: self
                    .layout
                    .group_info_for_slot(slot)
                    .is_some_and(|group| group.slot == slot),
                is_pointer_over: self.pointer_over_slot == Some(slot),
            };
            self.row_states.push((slot, state));
        }
        self.visual_refresh_count = self.row_states.len();
        tracing::trace!(
            target: targets::SELECTION,
            rows = self.visual_refresh_count,
            "visuals refreshed"
        );
    }

    /// Visual state of a displayed row.
    pub fn row_visual_state(&self, slot: usize) -> Option<RowVisualState> {
        self.row_states
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, state)| *state)
    }

    /// Number of rows the last visual refresh touched.
    pub fn visual_refresh_count(&self) -> usize {
        self.visual_refresh_count
    }

    /// Slot under the pointer, as of the last deferred refresh.
    pub fn pointer_over_slot(&self) -> Option<usize> {
        self.pointer_over_slot
    }

    pub(crate) fn refresh_pointer_over(&mut self) {
        let slot = self
            .pointer_y
            .and_then(|y| self.slot_at_offset(self.viewport.offset() + y))
            .filter(|&slot| slot < self.layout.slot_count());
        if slot != self.pointer_over_slot {
            self.pointer_over_slot = slot;
            self.refresh_visuals();
        }
    }
}
