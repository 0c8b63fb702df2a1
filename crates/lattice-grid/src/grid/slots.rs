//! Slot space layout and index conversions.
//!
//! A *slot* is a virtualized display position. Without grouping, slots and
//! row indexes coincide. With grouping, every group contributes a header slot
//! before its rows and optionally a footer slot after them:
//!
//! ```text
//! slot  0  [group 0 header]
//! slot  1    row 0
//! slot  2    row 1
//! slot  3  [group 0 footer]
//! slot  4  [group 1 header]
//! slot  5    row 2
//! ```
//!
//! Collapsing a group marks its rows and footer as collapsed. Collapsed slots
//! still exist in slot space but are out of bounds for selection.
//!
//! The *selection index* is the row index shifted by the page start when a
//! paged collection view is active (or the flattened index for hierarchical
//! sources, where the offset is zero).
//!
//! All conversions are total: invalid inputs produce `None` (or `true` for
//! [`SlotLayout::is_slot_out_of_bounds`]), never a panic.

use lattice_grid_core::logging::targets;

use super::index_table::IndexToValueTable;

/// Shape of one top-level row group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpec {
    /// Number of data rows in the group.
    pub row_count: usize,
    /// Whether the group has a footer slot.
    pub has_footer: bool,
    /// Whether the group starts collapsed.
    pub collapsed: bool,
}

impl GroupSpec {
    /// An expanded group without a footer.
    pub fn new(row_count: usize) -> Self {
        Self {
            row_count,
            has_footer: false,
            collapsed: false,
        }
    }

    /// Add a footer slot.
    pub fn with_footer(mut self) -> Self {
        self.has_footer = true;
        self
    }

    /// Start collapsed.
    pub fn collapsed(mut self) -> Self {
        self.collapsed = true;
        self
    }
}

/// Layout record of a row group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowGroupInfo {
    /// Index of the group.
    pub group_index: usize,
    /// Nesting level; top-level groups are 0.
    pub level: usize,
    /// Whether the header itself is visible.
    pub is_visible: bool,
    /// Header slot.
    pub slot: usize,
    /// Last slot belonging to the group (footer, last row, or the header of
    /// an empty group).
    pub last_sub_item_slot: usize,
}

/// Slot layout of the grid: row count, groups and collapsed slots.
#[derive(Debug, Clone, Default)]
pub struct SlotLayout {
    row_count: usize,
    groups: Vec<GroupSpec>,
    infos: Vec<RowGroupInfo>,
    /// First row index of each group.
    group_first_rows: Vec<usize>,
    headers: IndexToValueTable<usize>,
    footers: IndexToValueTable<usize>,
    collapsed: IndexToValueTable<bool>,
    selection_offset: usize,
}

impl SlotLayout {
    /// A flat layout of `row_count` rows.
    pub fn new(row_count: usize) -> Self {
        Self {
            row_count,
            ..Self::default()
        }
    }

    /// A grouped layout. The row count is the sum of the group sizes.
    pub fn with_groups(groups: &[GroupSpec]) -> Self {
        let mut layout = Self::default();
        layout.set_groups(groups);
        layout
    }

    // =========================================================================
    // Shape
    // =========================================================================

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of slots, including group slots and collapsed slots.
    pub fn slot_count(&self) -> usize {
        self.row_count + self.headers.index_count() + self.footers.index_count()
    }

    /// Returns `true` if the layout has groups.
    pub fn is_grouped(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Number of groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Group specs in order.
    pub fn groups(&self) -> &[GroupSpec] {
        &self.groups
    }

    /// Layout record of a group.
    pub fn group_info(&self, group: usize) -> Option<&RowGroupInfo> {
        self.infos.get(group)
    }

    /// Header slot of a group.
    pub fn group_header_slot(&self, group: usize) -> Option<usize> {
        self.infos.get(group).map(|info| info.slot)
    }

    /// Replace the layout with a flat one of `row_count` rows.
    pub fn set_row_count(&mut self, row_count: usize) {
        self.row_count = row_count;
        self.groups.clear();
        self.rebuild();
    }

    /// Replace the groups. The row count becomes the sum of the group sizes.
    pub fn set_groups(&mut self, groups: &[GroupSpec]) {
        self.groups = groups.to_vec();
        self.row_count = groups.iter().map(|g| g.row_count).sum();
        self.rebuild();
    }

    /// Collapse or expand a group. Returns `true` if its state changed.
    pub fn set_group_collapsed(&mut self, group: usize, collapsed: bool) -> bool {
        match self.groups.get_mut(group) {
            Some(spec) if spec.collapsed != collapsed => {
                spec.collapsed = collapsed;
                self.rebuild();
                tracing::debug!(
                    target: targets::SLOTS,
                    group,
                    collapsed,
                    "group collapse state changed"
                );
                true
            }
            _ => false,
        }
    }

    /// Offset added to row indexes to obtain selection indexes.
    pub fn selection_offset(&self) -> usize {
        self.selection_offset
    }

    /// Set the page start offset.
    pub fn set_selection_offset(&mut self, offset: usize) {
        self.selection_offset = offset;
    }

    /// Insert `count` rows at row index `row`. Returns the slot of the first
    /// inserted row; the inserted rows are contiguous in slot space.
    ///
    /// In a grouped layout the rows join the group containing `row`, or the
    /// last group when appending.
    pub fn insert_rows(&mut self, row: usize, count: usize) -> usize {
        let row = row.min(self.row_count);
        if self.groups.is_empty() {
            self.row_count += count;
            return row;
        }
        let group = self.group_of_row(row).unwrap_or(self.groups.len() - 1);
        self.groups[group].row_count += count;
        self.row_count += count;
        self.rebuild();
        let first_row = self.group_first_rows[group];
        self.infos[group].slot + 1 + (row - first_row)
    }

    /// Remove `count` rows starting at row index `row`.
    ///
    /// Returns the removed slot runs as `(slot, len)`, in descending slot
    /// order, so that slot-indexed tables can apply them one by one.
    pub fn remove_rows(&mut self, row: usize, count: usize) -> Vec<(usize, usize)> {
        let end = (row + count).min(self.row_count);
        if row >= end {
            return Vec::new();
        }
        if self.groups.is_empty() {
            self.row_count -= end - row;
            return vec![(row, end - row)];
        }
        let mut runs = Vec::new();
        for group in 0..self.groups.len() {
            let first = self.group_first_rows[group];
            let last = first + self.groups[group].row_count;
            let lo = row.max(first);
            let hi = end.min(last);
            if lo < hi {
                runs.push((self.infos[group].slot + 1 + (lo - first), hi - lo));
                self.groups[group].row_count -= hi - lo;
            }
        }
        self.row_count -= end - row;
        self.rebuild();
        runs.reverse();
        runs
    }

    fn group_of_row(&self, row: usize) -> Option<usize> {
        let pos = self.group_first_rows.partition_point(|&first| first <= row);
        let group = pos.checked_sub(1)?;
        (row < self.group_first_rows[group] + self.groups[group].row_count).then_some(group)
    }

    fn rebuild(&mut self) {
        self.headers.clear();
        self.footers.clear();
        self.collapsed.clear();
        self.infos.clear();
        self.group_first_rows.clear();

        let mut slot = 0;
        let mut first_row = 0;
        for (group_index, spec) in self.groups.iter().enumerate() {
            let header = slot;
            self.headers.add_value(header, group_index);
            let mut last = header + spec.row_count;
            if spec.has_footer {
                last += 1;
                self.footers.add_value(last, group_index);
            }
            if spec.collapsed && last > header {
                self.collapsed.add_values(header + 1, last - header, true);
            }
            self.infos.push(RowGroupInfo {
                group_index,
                level: 0,
                is_visible: true,
                slot: header,
                last_sub_item_slot: last,
            });
            self.group_first_rows.push(first_row);
            first_row += spec.row_count;
            slot = last + 1;
        }
    }

    // =========================================================================
    // Conversions
    // =========================================================================

    /// Slot of a data row.
    pub fn slot_from_row_index(&self, row: usize) -> Option<usize> {
        if row >= self.row_count {
            return None;
        }
        if self.groups.is_empty() {
            return Some(row);
        }
        let group = self.group_of_row(row)?;
        Some(self.infos[group].slot + 1 + (row - self.group_first_rows[group]))
    }

    /// Row index of a slot; `None` for group slots and out-of-range slots.
    pub fn row_index_from_slot(&self, slot: usize) -> Option<usize> {
        if slot >= self.slot_count() || self.is_group_slot(slot) {
            return None;
        }
        let group_slots_before =
            self.headers.index_count_in(0, slot) + self.footers.index_count_in(0, slot);
        Some(slot - group_slots_before)
    }

    /// Returns `true` if `slot` is a group header or footer.
    pub fn is_group_slot(&self, slot: usize) -> bool {
        self.headers.contains(slot) || self.footers.contains(slot)
    }

    /// Group info for a header or footer slot.
    pub fn group_info_for_slot(&self, slot: usize) -> Option<&RowGroupInfo> {
        let group = self
            .headers
            .get(slot)
            .or_else(|| self.footers.get(slot))?;
        self.infos.get(*group)
    }

    /// Returns `true` if `slot` is hidden by a collapsed group.
    pub fn is_collapsed(&self, slot: usize) -> bool {
        self.collapsed.contains(slot)
    }

    /// Number of collapsed slots before `slot`.
    pub fn collapsed_before(&self, slot: usize) -> usize {
        slot.checked_sub(1)
            .map_or(0, |last| self.collapsed.index_count_in(0, last))
    }

    /// The `n`th non-collapsed slot.
    pub fn nth_visible_slot(&self, n: usize) -> Option<usize> {
        let mut slot = n;
        for (lower, upper, _) in self.collapsed.ranges() {
            if lower > slot {
                break;
            }
            slot += upper - lower + 1;
        }
        (slot < self.slot_count()).then_some(slot)
    }

    /// Returns `true` if `slot` cannot be targeted by selection.
    ///
    /// `-1` (no slot) is in bounds; anything below it, at or past the slot
    /// count, or collapsed is out of bounds.
    pub fn is_slot_out_of_bounds(&self, slot: isize) -> bool {
        if slot < -1 || slot >= self.slot_count() as isize {
            return true;
        }
        slot >= 0 && self.collapsed.contains(slot as usize)
    }

    /// Selection-model index of a slot.
    pub fn selection_index_from_slot(&self, slot: usize) -> Option<usize> {
        if self.is_collapsed(slot) {
            return None;
        }
        self.row_index_from_slot(slot)
            .map(|row| row + self.selection_offset)
    }

    /// Slot of a selection-model index.
    pub fn slot_from_selection_index(&self, index: usize) -> Option<usize> {
        let row = index.checked_sub(self.selection_offset)?;
        self.slot_from_row_index(row)
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// First non-collapsed slot after `after` (or the first one overall).
    pub fn next_visible_slot(&self, after: Option<usize>) -> Option<usize> {
        let mut slot = after.map_or(0, |s| s + 1);
        while let Some((_, upper)) = self.collapsed.range_bounds(slot) {
            slot = upper + 1;
        }
        (slot < self.slot_count()).then_some(slot)
    }

    /// Last non-collapsed slot before `before` (or the last one overall).
    pub fn previous_visible_slot(&self, before: Option<usize>) -> Option<usize> {
        let mut slot = match before {
            Some(s) => s.checked_sub(1)?,
            None => self.slot_count().checked_sub(1)?,
        };
        while let Some((lower, _)) = self.collapsed.range_bounds(slot) {
            slot = lower.checked_sub(1)?;
        }
        Some(slot)
    }

    /// Next non-collapsed data-row slot after `after`.
    pub fn next_row_slot(&self, after: Option<usize>) -> Option<usize> {
        let mut cursor = after;
        loop {
            let slot = self.next_visible_slot(cursor)?;
            if !self.is_group_slot(slot) {
                return Some(slot);
            }
            cursor = Some(slot);
        }
    }

    /// Previous non-collapsed data-row slot before `before`.
    pub fn previous_row_slot(&self, before: Option<usize>) -> Option<usize> {
        let mut cursor = before;
        loop {
            let slot = self.previous_visible_slot(cursor)?;
            if !self.is_group_slot(slot) {
                return Some(slot);
            }
            cursor = Some(slot);
        }
    }
}
