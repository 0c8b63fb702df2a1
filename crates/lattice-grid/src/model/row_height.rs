//! Row-height estimation for virtualized content.
//!
//! Rows that were never realized have no measured height, so the grid asks a
//! [`RowHeightEstimator`] for offsets. The estimator is told about structural
//! churn (inserted and removed slots) so its measurements stay attached to the
//! right rows.

/// Default height used before anything has been measured.
pub const DEFAULT_ROW_HEIGHT: f64 = 22.0;

/// Estimates row heights and content offsets for slots.
pub trait RowHeightEstimator: Send {
    /// The data source was replaced or reset and now has `count` slots.
    fn on_data_source_changed(&mut self, count: usize);

    /// `count` slots were inserted at `slot`.
    fn on_items_inserted(&mut self, slot: usize, count: usize);

    /// `count` slots starting at `slot` were removed.
    fn on_items_removed(&mut self, slot: usize, count: usize);

    /// A realized row at `slot` measured `height`.
    fn record_measured(&mut self, slot: usize, height: f64);

    /// Estimated height of `slot`.
    fn estimate_height(&self, slot: usize) -> f64;

    /// Estimated content offset of the top edge of `slot`.
    fn estimate_offset(&self, slot: usize) -> f64;

    /// Number of slots the estimator is tracking.
    fn slot_count(&self) -> usize;

    /// Slot whose extent contains `offset`.
    ///
    /// The default walks slots from the top; implementations with an index
    /// can do better.
    fn slot_at_offset(&self, offset: f64) -> Option<usize> {
        let count = self.slot_count();
        if count == 0 || offset < 0.0 {
            return (count > 0).then_some(0);
        }
        let mut top = 0.0;
        for slot in 0..count {
            let height = self.estimate_height(slot);
            if offset < top + height {
                return Some(slot);
            }
            top += height;
        }
        Some(count - 1)
    }

    /// Estimated total content height.
    fn total_height(&self) -> f64 {
        let count = self.slot_count();
        if count == 0 {
            0.0
        } else {
            self.estimate_offset(count - 1) + self.estimate_height(count - 1)
        }
    }
}

/// Estimator that uses measured heights where known and the running average
/// of measurements everywhere else.
#[derive(Debug, Clone)]
pub struct AverageRowHeightEstimator {
    default_height: f64,
    measured: Vec<Option<f64>>,
    measured_sum: f64,
    measured_count: usize,
}

impl AverageRowHeightEstimator {
    /// Create an estimator whose unmeasured rows are `default_height` tall
    /// until the first measurement arrives.
    pub fn new(default_height: f64) -> Self {
        Self {
            default_height: default_height.max(1.0),
            measured: Vec::new(),
            measured_sum: 0.0,
            measured_count: 0,
        }
    }

    /// Height assumed for rows that were never measured.
    pub fn average_height(&self) -> f64 {
        if self.measured_count == 0 {
            self.default_height
        } else {
            self.measured_sum / self.measured_count as f64
        }
    }

    fn forget(&mut self, height: Option<f64>) {
        if let Some(h) = height {
            self.measured_sum -= h;
            self.measured_count -= 1;
        }
    }
}

impl Default for AverageRowHeightEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_ROW_HEIGHT)
    }
}

impl RowHeightEstimator for AverageRowHeightEstimator {
    fn on_data_source_changed(&mut self, count: usize) {
        self.measured.clear();
        self.measured.resize(count, None);
        self.measured_sum = 0.0;
        self.measured_count = 0;
    }

    fn on_items_inserted(&mut self, slot: usize, count: usize) {
        let slot = slot.min(self.measured.len());
        self.measured
            .splice(slot..slot, std::iter::repeat_n(None, count));
    }

    fn on_items_removed(&mut self, slot: usize, count: usize) {
        let start = slot.min(self.measured.len());
        let end = (slot + count).min(self.measured.len());
        let removed: Vec<_> = self.measured.drain(start..end).collect();
        for height in removed {
            self.forget(height);
        }
    }

    fn record_measured(&mut self, slot: usize, height: f64) {
        if slot >= self.measured.len() {
            self.measured.resize(slot + 1, None);
        }
        let previous = self.measured[slot].replace(height);
        self.forget(previous);
        self.measured_sum += height;
        self.measured_count += 1;
    }

    fn estimate_height(&self, slot: usize) -> f64 {
        self.measured
            .get(slot)
            .copied()
            .flatten()
            .unwrap_or_else(|| self.average_height())
    }

    fn estimate_offset(&self, slot: usize) -> f64 {
        if self.measured_count == 0 {
            return slot as f64 * self.default_height;
        }
        let average = self.average_height();
        let known = slot.min(self.measured.len());
        let mut offset: f64 = self.measured[..known]
            .iter()
            .map(|h| h.unwrap_or(average))
            .sum();
        offset += (slot - known) as f64 * average;
        offset
    }

    fn slot_count(&self) -> usize {
        self.measured.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_offsets_before_measurement() {
        let mut estimator = AverageRowHeightEstimator::new(20.0);
        estimator.on_data_source_changed(100);
        assert_eq!(estimator.estimate_offset(0), 0.0);
        assert_eq!(estimator.estimate_offset(50), 1000.0);
        assert_eq!(estimator.estimate_height(99), 20.0);
        assert_eq!(estimator.total_height(), 2000.0);
    }

    #[test]
    fn test_measurements_shift_with_churn() {
        let mut estimator = AverageRowHeightEstimator::new(20.0);
        estimator.on_data_source_changed(10);
        estimator.record_measured(5, 40.0);
        estimator.on_items_inserted(2, 3);
        assert_eq!(estimator.slot_count(), 13);
        assert_eq!(estimator.estimate_height(8), 40.0);

        estimator.on_items_removed(0, 4);
        assert_eq!(estimator.estimate_height(4), 40.0);

        estimator.on_items_removed(4, 1);
        assert_eq!(estimator.average_height(), 20.0);
    }

    #[test]
    fn test_average_applies_to_unmeasured_rows() {
        let mut estimator = AverageRowHeightEstimator::new(20.0);
        estimator.on_data_source_changed(4);
        estimator.record_measured(0, 30.0);
        estimator.record_measured(1, 10.0);
        assert_eq!(estimator.average_height(), 20.0);
        estimator.record_measured(1, 30.0);
        assert_eq!(estimator.average_height(), 30.0);
        assert_eq!(estimator.estimate_offset(3), 90.0);
    }

    #[test]
    fn test_slot_at_offset() {
        let mut estimator = AverageRowHeightEstimator::new(10.0);
        estimator.on_data_source_changed(5);
        assert_eq!(estimator.slot_at_offset(0.0), Some(0));
        assert_eq!(estimator.slot_at_offset(25.0), Some(2));
        assert_eq!(estimator.slot_at_offset(1000.0), Some(4));

        let empty = AverageRowHeightEstimator::new(10.0);
        assert_eq!(empty.slot_at_offset(0.0), None);
    }
}
