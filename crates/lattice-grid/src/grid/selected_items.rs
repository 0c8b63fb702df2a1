//! Row-level selection state.
//!
//! [`SelectedItemsCollection`] stores selected slots as ranges rather than as
//! an item list, so selecting a million rows costs one range. Item deltas for
//! `selection_changed` are computed on demand by comparing the current ranges
//! with the ranges at the last flush.
//!
//! Structural changes (rows inserted, removed, moved or remapped) are applied
//! to both the current and the flushed ranges, so a row that merely moved is
//! never reported as removed and re-added. Rows that leave the data while they
//! were selected at the last flush are remembered and reported as removed by
//! the next delta.

use super::index_table::IndexToValueTable;

/// Item delta since the last flush.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionDelta<T> {
    /// Items that became selected.
    pub added: Vec<T>,
    /// Items that stopped being selected.
    pub removed: Vec<T>,
}

impl<T> SelectionDelta<T> {
    /// Returns `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Range-compressed set of selected row slots.
#[derive(Debug, Clone)]
pub struct SelectedItemsCollection<T> {
    selected: IndexToValueTable<bool>,
    flushed: IndexToValueTable<bool>,
    pending_removed: Vec<T>,
}

impl<T> Default for SelectedItemsCollection<T> {
    fn default() -> Self {
        Self {
            selected: IndexToValueTable::new(),
            flushed: IndexToValueTable::new(),
            pending_removed: Vec::new(),
        }
    }
}

impl<T: Clone> SelectedItemsCollection<T> {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Number of selected slots.
    pub fn len(&self) -> usize {
        self.selected.index_count()
    }

    /// Returns `true` if `slot` is selected.
    pub fn contains(&self, slot: usize) -> bool {
        self.selected.contains(slot)
    }

    /// Selected slots at or after `start`, ascending.
    ///
    /// The sequence is lazy and finite; call again to restart it.
    pub fn get_slots(&self, start: usize) -> impl Iterator<Item = usize> + '_ {
        self.selected.indexes_from(start)
    }

    /// First selected slot.
    pub fn first_slot(&self) -> Option<usize> {
        self.selected.first_index()
    }

    // =========================================================================
    // Selection mutations
    // =========================================================================

    /// Select a slot. Returns `true` if it was not selected before.
    pub fn add_slot(&mut self, slot: usize) -> bool {
        if self.selected.contains(slot) {
            return false;
        }
        self.selected.add_value(slot, true);
        true
    }

    /// Select `count` slots starting at `start`.
    pub fn add_slots(&mut self, start: usize, count: usize) {
        self.selected.add_values(start, count, true);
    }

    /// Deselect a slot. Returns `true` if it was selected.
    pub fn remove_slot(&mut self, slot: usize) -> bool {
        if !self.selected.contains(slot) {
            return false;
        }
        self.selected.remove_value(slot);
        true
    }

    /// Deselect everything.
    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Replace the selection with exactly `slots`.
    pub fn replace_with(&mut self, slots: impl IntoIterator<Item = usize>) {
        self.selected.clear();
        for slot in slots {
            self.selected.add_value(slot, true);
        }
    }

    // =========================================================================
    // Structural changes
    // =========================================================================

    /// Shift for `count` slots inserted at `slot`.
    pub fn insert_slots(&mut self, slot: usize, count: usize) {
        self.selected.insert_indexes(slot, count);
        self.flushed.insert_indexes(slot, count);
    }

    /// Drop and shift for `count` slots removed at `slot`.
    ///
    /// `item_at` resolves a slot to its item *before* the removal; it is
    /// consulted only for removed slots that were selected at the last flush.
    pub fn remove_slots<F>(&mut self, slot: usize, count: usize, item_at: F)
    where
        F: Fn(usize) -> Option<T>,
    {
        let end = slot + count;
        let lost: Vec<usize> = self
            .flushed
            .indexes_from(slot)
            .take_while(|&s| s < end)
            .collect();
        self.pending_removed
            .extend(lost.into_iter().filter_map(&item_at));
        self.selected.remove_indexes(slot, count);
        self.flushed.remove_indexes(slot, count);
    }

    /// Translate every slot through `map`; unmapped slots are dropped.
    ///
    /// Returns the number of selected slots that were dropped. `item_at`
    /// resolves old slots for the removed-item report.
    pub fn remap<M, F>(&mut self, map: M, item_at: F) -> usize
    where
        M: Fn(usize) -> Option<usize>,
        F: Fn(usize) -> Option<T>,
    {
        let mut dropped = 0;
        let mut selected = IndexToValueTable::new();
        for old in self.selected.indexes() {
            match map(old) {
                Some(new) => selected.add_value(new, true),
                None => dropped += 1,
            }
        }
        let mut flushed = IndexToValueTable::new();
        for old in self.flushed.indexes() {
            match map(old) {
                Some(new) => flushed.add_value(new, true),
                None => self.pending_removed.extend(item_at(old)),
            }
        }
        self.selected = selected;
        self.flushed = flushed;
        dropped
    }

    // =========================================================================
    // Flush
    // =========================================================================

    /// Compute the item delta since the last flush and start a new baseline.
    ///
    /// `item_at` resolves a slot to its current item.
    pub fn take_delta<F>(&mut self, item_at: F) -> SelectionDelta<T>
    where
        F: Fn(usize) -> Option<T>,
    {
        let added = self
            .selected
            .indexes()
            .filter(|&s| !self.flushed.contains(s))
            .filter_map(&item_at)
            .collect();
        let mut removed = std::mem::take(&mut self.pending_removed);
        removed.extend(
            self.flushed
                .indexes()
                .filter(|&s| !self.selected.contains(s))
                .filter_map(&item_at),
        );
        self.flushed = self.selected.clone();
        SelectionDelta { added, removed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<&'static str> {
        vec!["a", "b", "c", "d", "e", "f"]
    }

    fn lookup<'a>(rows: &'a [&'static str]) -> impl Fn(usize) -> Option<&'static str> + 'a {
        move |slot| rows.get(slot).copied()
    }

    #[test]
    fn test_ranges_are_compressed() {
        let mut selection = SelectedItemsCollection::<&str>::new();
        selection.add_slots(0, 1000);
        selection.add_slot(1000);
        assert_eq!(selection.len(), 1001);
        assert_eq!(selection.selected.range_count(), 1);
        assert!(!selection.add_slot(5));
    }

    #[test]
    fn test_get_slots_is_restartable() {
        let mut selection = SelectedItemsCollection::<&str>::new();
        selection.replace_with([1, 2, 7]);
        assert_eq!(selection.get_slots(0).collect::<Vec<_>>(), vec![1, 2, 7]);
        assert_eq!(selection.get_slots(2).collect::<Vec<_>>(), vec![2, 7]);
        assert_eq!(selection.get_slots(0).count(), 3);
    }

    #[test]
    fn test_delta_since_last_flush() {
        let rows = items();
        let mut selection = SelectedItemsCollection::new();
        selection.add_slot(1);
        let delta = selection.take_delta(lookup(&rows));
        assert_eq!(delta.added, vec!["b"]);
        assert!(delta.removed.is_empty());

        selection.remove_slot(1);
        selection.add_slot(3);
        let delta = selection.take_delta(lookup(&rows));
        assert_eq!(delta.added, vec!["d"]);
        assert_eq!(delta.removed, vec!["b"]);
        assert!(selection.take_delta(lookup(&rows)).is_empty());
    }

    #[test]
    fn test_add_then_remove_nets_out() {
        let rows = items();
        let mut selection = SelectedItemsCollection::new();
        selection.add_slot(2);
        selection.remove_slot(2);
        assert!(selection.take_delta(lookup(&rows)).is_empty());
    }

    #[test]
    fn test_insert_shifts_without_delta() {
        let mut rows = items();
        let mut selection = SelectedItemsCollection::new();
        selection.add_slot(2);
        selection.take_delta(lookup(&rows));

        rows.insert(0, "z");
        selection.insert_slots(0, 1);
        assert!(selection.contains(3));
        assert!(selection.take_delta(lookup(&rows)).is_empty());
    }

    #[test]
    fn test_removed_selected_row_is_reported() {
        let rows = items();
        let mut selection = SelectedItemsCollection::new();
        selection.add_slots(1, 2);
        selection.take_delta(lookup(&rows));

        selection.remove_slots(1, 1, lookup(&rows));
        let remaining: Vec<&str> = rows.iter().copied().filter(|r| *r != "b").collect();
        assert_eq!(selection.get_slots(0).collect::<Vec<_>>(), vec![1]);
        let delta = selection.take_delta(lookup(&remaining));
        assert!(delta.added.is_empty());
        assert_eq!(delta.removed, vec!["b"]);
    }

    #[test]
    fn test_remap_drops_unmapped() {
        let rows = items();
        let mut selection = SelectedItemsCollection::new();
        selection.replace_with([1, 3, 5]);
        selection.take_delta(lookup(&rows));

        // Rows 2..4 disappear.
        let dropped = selection.remap(
            |old| match old {
                0 | 1 => Some(old),
                2..=3 => None,
                _ => Some(old - 2),
            },
            lookup(&rows),
        );
        assert_eq!(dropped, 1);
        assert_eq!(selection.get_slots(0).collect::<Vec<_>>(), vec![1, 3]);
        let remaining = vec!["a", "b", "e", "f"];
        let delta = selection.take_delta(lookup(&remaining));
        assert!(delta.added.is_empty());
        assert_eq!(delta.removed, vec!["d"]);
    }
}
