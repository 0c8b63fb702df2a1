//! Range-compressed index → value table.
//!
//! `IndexToValueTable<V>` maps `usize` indexes to values, storing runs of
//! consecutive indexes with equal values as a single range. The grid uses it
//! for selected slots, collapsed slots and group header/footer slots, all of
//! which are naturally run-shaped, so memory is O(ranges) rather than
//! O(indexes).
//!
//! Besides plain set/remove operations the table supports *index* insertion
//! and removal, which shift every following entry the way rows shift when
//! items are inserted into or removed from a data source.

#[derive(Debug, Clone, PartialEq)]
struct Range<V> {
    lower: usize,
    /// Inclusive.
    upper: usize,
    value: V,
}

impl<V> Range<V> {
    fn len(&self) -> usize {
        self.upper - self.lower + 1
    }
}

/// A sorted, range-compressed map from indexes to values.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexToValueTable<V> {
    ranges: Vec<Range<V>>,
}

impl<V> Default for IndexToValueTable<V> {
    fn default() -> Self {
        Self { ranges: Vec::new() }
    }
}

impl<V: Clone + PartialEq> IndexToValueTable<V> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no index has a value.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    /// Number of stored ranges.
    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    /// Total number of indexes with a value.
    pub fn index_count(&self) -> usize {
        self.ranges.iter().map(Range::len).sum()
    }

    /// Number of indexes with a value in the closed range `[start, end]`.
    pub fn index_count_in(&self, start: usize, end: usize) -> usize {
        if end < start {
            return 0;
        }
        self.ranges
            .iter()
            .filter(|r| r.upper >= start && r.lower <= end)
            .map(|r| r.upper.min(end) - r.lower.max(start) + 1)
            .sum()
    }

    fn find(&self, index: usize) -> Option<usize> {
        let pos = self.ranges.partition_point(|r| r.upper < index);
        (pos < self.ranges.len() && self.ranges[pos].lower <= index).then_some(pos)
    }

    /// Returns `true` if `index` has a value.
    pub fn contains(&self, index: usize) -> bool {
        self.find(index).is_some()
    }

    /// Value stored at `index`.
    pub fn get(&self, index: usize) -> Option<&V> {
        self.find(index).map(|pos| &self.ranges[pos].value)
    }

    /// Bounds `(lower, upper_inclusive)` of the run containing `index`.
    pub fn range_bounds(&self, index: usize) -> Option<(usize, usize)> {
        self.find(index)
            .map(|pos| (self.ranges[pos].lower, self.ranges[pos].upper))
    }

    /// Smallest index with a value.
    pub fn first_index(&self) -> Option<usize> {
        self.ranges.first().map(|r| r.lower)
    }

    /// Largest index with a value.
    pub fn last_index(&self) -> Option<usize> {
        self.ranges.last().map(|r| r.upper)
    }

    /// Smallest index with a value that is greater than `after`.
    pub fn next_index(&self, after: usize) -> Option<usize> {
        let target = after.checked_add(1)?;
        let pos = self.ranges.partition_point(|r| r.upper < target);
        self.ranges.get(pos).map(|r| r.lower.max(target))
    }

    /// Largest index with a value that is smaller than `before`.
    pub fn previous_index(&self, before: usize) -> Option<usize> {
        let target = before.checked_sub(1)?;
        let pos = self.ranges.partition_point(|r| r.lower <= target);
        pos.checked_sub(1)
            .map(|p| self.ranges[p].upper.min(target))
    }

    /// All indexes with a value, ascending.
    pub fn indexes(&self) -> impl Iterator<Item = usize> + '_ {
        self.ranges.iter().flat_map(|r| r.lower..=r.upper)
    }

    /// Indexes with a value at or after `start`, ascending.
    ///
    /// The iterator is lazy and finite; call again to restart.
    pub fn indexes_from(&self, start: usize) -> impl Iterator<Item = usize> + '_ {
        let pos = self.ranges.partition_point(|r| r.upper < start);
        self.ranges[pos..]
            .iter()
            .flat_map(move |r| r.lower.max(start)..=r.upper)
    }

    /// Stored runs as `(lower, upper_inclusive, value)`.
    pub fn ranges(&self) -> impl Iterator<Item = (usize, usize, &V)> + '_ {
        self.ranges.iter().map(|r| (r.lower, r.upper, &r.value))
    }

    // =========================================================================
    // Value Mutation
    // =========================================================================

    /// Set the value of a single index.
    pub fn add_value(&mut self, index: usize, value: V) {
        self.add_values(index, 1, value);
    }

    /// Set `count` consecutive indexes starting at `start` to `value`.
    pub fn add_values(&mut self, start: usize, count: usize, value: V) {
        if count == 0 {
            return;
        }
        self.remove_values(start, count);
        let upper = start + count - 1;
        let pos = self.ranges.partition_point(|r| r.upper < start);
        self.ranges.insert(
            pos,
            Range {
                lower: start,
                upper,
                value,
            },
        );
        self.merge_at(pos);
    }

    /// Remove the value of a single index.
    pub fn remove_value(&mut self, index: usize) {
        self.remove_values(index, 1);
    }

    /// Remove the values of `count` indexes starting at `start`. Following
    /// indexes keep their positions.
    pub fn remove_values(&mut self, start: usize, count: usize) {
        if count == 0 || self.ranges.is_empty() {
            return;
        }
        let end = start + count - 1;
        let mut kept = Vec::with_capacity(self.ranges.len() + 1);
        for range in self.ranges.drain(..) {
            if range.upper < start || range.lower > end {
                kept.push(range);
                continue;
            }
            if range.lower < start {
                kept.push(Range {
                    lower: range.lower,
                    upper: start - 1,
                    value: range.value.clone(),
                });
            }
            if range.upper > end {
                kept.push(Range {
                    lower: end + 1,
                    upper: range.upper,
                    value: range.value,
                });
            }
        }
        self.ranges = kept;
    }

    // =========================================================================
    // Index Mutation
    // =========================================================================

    /// Insert an empty index at `index`, shifting following entries up.
    pub fn insert_index(&mut self, index: usize) {
        self.insert_indexes(index, 1);
    }

    /// Insert `count` empty indexes at `start`, shifting following entries up.
    pub fn insert_indexes(&mut self, start: usize, count: usize) {
        if count == 0 {
            return;
        }
        let mut shifted = Vec::with_capacity(self.ranges.len() + 1);
        for range in self.ranges.drain(..) {
            if range.upper < start {
                shifted.push(range);
            } else if range.lower >= start {
                shifted.push(Range {
                    lower: range.lower + count,
                    upper: range.upper + count,
                    value: range.value,
                });
            } else {
                shifted.push(Range {
                    lower: range.lower,
                    upper: start - 1,
                    value: range.value.clone(),
                });
                shifted.push(Range {
                    lower: start + count,
                    upper: range.upper + count,
                    value: range.value,
                });
            }
        }
        self.ranges = shifted;
    }

    /// Remove the index at `index`, shifting following entries down.
    pub fn remove_index(&mut self, index: usize) {
        self.remove_indexes(index, 1);
    }

    /// Remove `count` indexes starting at `start`, dropping their values and
    /// shifting following entries down.
    pub fn remove_indexes(&mut self, start: usize, count: usize) {
        if count == 0 {
            return;
        }
        self.remove_values(start, count);
        for range in &mut self.ranges {
            if range.lower >= start {
                range.lower -= count;
                range.upper -= count;
            }
        }
        self.merge_all();
    }

    fn merge_at(&mut self, pos: usize) {
        if pos + 1 < self.ranges.len() && self.can_merge(pos, pos + 1) {
            let next = self.ranges.remove(pos + 1);
            self.ranges[pos].upper = next.upper;
        }
        if pos > 0 && self.can_merge(pos - 1, pos) {
            let current = self.ranges.remove(pos);
            self.ranges[pos - 1].upper = current.upper;
        }
    }

    fn merge_all(&mut self) {
        let mut pos = 0;
        while pos + 1 < self.ranges.len() {
            if self.can_merge(pos, pos + 1) {
                let next = self.ranges.remove(pos + 1);
                self.ranges[pos].upper = next.upper;
            } else {
                pos += 1;
            }
        }
    }

    fn can_merge(&self, a: usize, b: usize) -> bool {
        let (a, b) = (&self.ranges[a], &self.ranges[b]);
        a.upper + 1 == b.lower && a.value == b.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_adjacent_values_merge() {
        let mut table = IndexToValueTable::new();
        table.add_values(0, 3, true);
        table.add_values(3, 2, true);
        table.add_value(10, true);
        assert_eq!(table.range_count(), 2);
        assert_eq!(table.index_count(), 6);
        assert!(table.contains(4));
        assert!(!table.contains(5));
    }

    #[test]
    fn test_different_values_do_not_merge() {
        let mut table = IndexToValueTable::new();
        table.add_values(0, 2, 'a');
        table.add_values(2, 2, 'b');
        assert_eq!(table.range_count(), 2);
        assert_eq!(table.get(1), Some(&'a'));
        assert_eq!(table.get(2), Some(&'b'));
    }

    #[test]
    fn test_remove_values_splits() {
        let mut table = IndexToValueTable::new();
        table.add_values(0, 10, true);
        table.remove_values(3, 2);
        assert_eq!(table.indexes().collect::<Vec<_>>(), vec![0, 1, 2, 5, 6, 7, 8, 9]);
        assert_eq!(table.range_count(), 2);
        assert_eq!(table.index_count_in(2, 6), 3);
    }

    #[test]
    fn test_insert_indexes_shift_and_split() {
        let mut table = IndexToValueTable::new();
        table.add_values(2, 4, true);
        table.insert_indexes(4, 3);
        assert_eq!(table.indexes().collect::<Vec<_>>(), vec![2, 3, 7, 8]);
        table.insert_index(0);
        assert_eq!(table.first_index(), Some(3));
    }

    #[test]
    fn test_remove_indexes_shift_and_merge() {
        let mut table = IndexToValueTable::new();
        table.add_values(0, 2, true);
        table.add_values(5, 2, true);
        table.remove_indexes(2, 3);
        assert_eq!(table.indexes().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert_eq!(table.range_count(), 1);

        table.remove_index(0);
        assert_eq!(table.indexes().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_next_and_previous_index() {
        let mut table = IndexToValueTable::new();
        table.add_values(3, 2, ());
        table.add_value(9, ());
        assert_eq!(table.next_index(0), Some(3));
        assert_eq!(table.next_index(3), Some(4));
        assert_eq!(table.next_index(4), Some(9));
        assert_eq!(table.next_index(9), None);
        assert_eq!(table.previous_index(9), Some(4));
        assert_eq!(table.previous_index(4), Some(3));
        assert_eq!(table.previous_index(3), None);
        assert_eq!(table.previous_index(100), Some(9));
    }

    #[test]
    fn test_indexes_from_is_restartable() {
        let mut table = IndexToValueTable::new();
        table.add_values(0, 3, ());
        table.add_values(6, 2, ());
        let first: Vec<_> = table.indexes_from(2).collect();
        let second: Vec<_> = table.indexes_from(2).collect();
        assert_eq!(first, vec![2, 6, 7]);
        assert_eq!(first, second);
        assert_eq!(table.last_index(), Some(7));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(usize, usize, u8),
        Remove(usize, usize),
        Insert(usize, usize),
        RemoveIndexes(usize, usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..40, 1usize..6, 0u8..2).prop_map(|(s, c, v)| Op::Add(s, c, v)),
            (0usize..40, 1usize..6).prop_map(|(s, c)| Op::Remove(s, c)),
            (0usize..40, 1usize..6).prop_map(|(s, c)| Op::Insert(s, c)),
            (0usize..40, 1usize..6).prop_map(|(s, c)| Op::RemoveIndexes(s, c)),
        ]
    }

    proptest! {
        #[test]
        fn prop_matches_btreemap(ops in prop::collection::vec(op(), 1..30)) {
            let mut table = IndexToValueTable::new();
            let mut reference: BTreeMap<usize, u8> = BTreeMap::new();
            for op in ops {
                match op {
                    Op::Add(s, c, v) => {
                        table.add_values(s, c, v);
                        for i in s..s + c {
                            reference.insert(i, v);
                        }
                    }
                    Op::Remove(s, c) => {
                        table.remove_values(s, c);
                        for i in s..s + c {
                            reference.remove(&i);
                        }
                    }
                    Op::Insert(s, c) => {
                        table.insert_indexes(s, c);
                        reference = reference
                            .into_iter()
                            .map(|(i, v)| if i >= s { (i + c, v) } else { (i, v) })
                            .collect();
                    }
                    Op::RemoveIndexes(s, c) => {
                        table.remove_indexes(s, c);
                        reference = reference
                            .into_iter()
                            .filter(|(i, _)| *i < s || *i >= s + c)
                            .map(|(i, v)| if i >= s + c { (i - c, v) } else { (i, v) })
                            .collect();
                    }
                }
            }
            let actual: Vec<(usize, u8)> = table.indexes().map(|i| (i, *table.get(i).unwrap())).collect();
            let expected: Vec<(usize, u8)> = reference.into_iter().collect();
            prop_assert_eq!(actual, expected);
            // Adjacent equal runs are always merged.
            let ranges: Vec<_> = table.ranges().collect();
            for pair in ranges.windows(2) {
                prop_assert!(!(pair[0].1 + 1 == pair[1].0 && pair[0].2 == pair[1].2));
            }
        }
    }
}
