//! Old-to-new index translation across a structural change.
//!
//! A hierarchical model reports every structural mutation as a list of
//! [`FlattenedChange`] records plus a [`FlattenedIndexMap`]. Consumers use the
//! map to carry row-based state (selection, currency, scroll anchor) from the
//! old flattened index space into the new one.
//!
//! Two shapes are supported:
//!
//! - **Shift maps** are derived from the change list alone. An old index that
//!   falls inside a change's replaced range has no counterpart; every other
//!   index moves by the net count delta of the changes before it.
//! - **Explicit maps** carry a full old→new table. Sorting produces these,
//!   since a reorder cannot be described by shifts.

/// A contiguous structural change in a flattened row list.
///
/// `old_count` rows starting at `index` were replaced by `new_count` rows.
/// `index` is expressed in old coordinates; changes in a list are ascending
/// and non-overlapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlattenedChange {
    /// First affected old index.
    pub index: usize,
    /// Number of rows that disappeared.
    pub old_count: usize,
    /// Number of rows that appeared in their place.
    pub new_count: usize,
}

impl FlattenedChange {
    /// Create a change record.
    pub fn new(index: usize, old_count: usize, new_count: usize) -> Self {
        Self {
            index,
            old_count,
            new_count,
        }
    }

    /// Rows inserted without removing anything.
    pub fn inserted(index: usize, count: usize) -> Self {
        Self::new(index, 0, count)
    }

    /// Rows removed without inserting anything.
    pub fn removed(index: usize, count: usize) -> Self {
        Self::new(index, count, 0)
    }

    /// Net change in row count.
    pub fn delta(&self) -> isize {
        self.new_count as isize - self.old_count as isize
    }

    /// One past the last old index covered by this change.
    pub fn old_end(&self) -> usize {
        self.index + self.old_count
    }
}

#[derive(Debug, Clone, PartialEq)]
enum MapKind {
    Shifts(Vec<FlattenedChange>),
    Explicit(Vec<Option<usize>>),
}

/// Translation from old flattened indices to new ones.
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedIndexMap {
    kind: MapKind,
}

impl FlattenedIndexMap {
    /// A map that leaves every index unchanged.
    pub fn identity() -> Self {
        Self {
            kind: MapKind::Shifts(Vec::new()),
        }
    }

    /// Build a shift map from an ascending, non-overlapping change list.
    pub fn from_changes(changes: &[FlattenedChange]) -> Self {
        let mut changes = changes.to_vec();
        changes.sort_by_key(|c| c.index);
        Self {
            kind: MapKind::Shifts(changes),
        }
    }

    /// Build a map from an explicit table: `table[old]` is the new index, or
    /// `None` if the row did not survive.
    pub fn explicit(table: Vec<Option<usize>>) -> Self {
        Self {
            kind: MapKind::Explicit(table),
        }
    }

    /// Returns `true` if this map was built from a full table.
    pub fn is_explicit(&self) -> bool {
        matches!(self.kind, MapKind::Explicit(_))
    }

    /// Translate an old index. Returns `None` if the row was removed.
    pub fn map_old_to_new(&self, old: usize) -> Option<usize> {
        match &self.kind {
            MapKind::Explicit(table) => table.get(old).copied().flatten(),
            MapKind::Shifts(changes) => {
                let mut delta: isize = 0;
                for change in changes {
                    if old < change.index {
                        break;
                    }
                    if old < change.old_end() {
                        return None;
                    }
                    delta += change.delta();
                }
                usize::try_from(old as isize + delta).ok()
            }
        }
    }

    /// Translate an old index, falling back to the nearest surviving position
    /// when the row itself was removed.
    ///
    /// For a shift map the fallback is the start of the replacing range in new
    /// coordinates, clamped into `[0, new_len)`. For an explicit map it is the
    /// translation of the closest surviving old index.
    pub fn map_old_to_nearest(&self, old: usize, new_len: usize) -> Option<usize> {
        if new_len == 0 {
            return None;
        }
        if let Some(mapped) = self.map_old_to_new(old) {
            return Some(mapped.min(new_len - 1));
        }
        match &self.kind {
            MapKind::Shifts(changes) => {
                let mut delta: isize = 0;
                for change in changes {
                    if old < change.old_end() {
                        let start = (change.index as isize + delta).max(0) as usize;
                        let offset = old - change.index;
                        let within = if change.new_count > 0 {
                            start + offset.min(change.new_count - 1)
                        } else {
                            start
                        };
                        return Some(within.min(new_len - 1));
                    }
                    delta += change.delta();
                }
                None
            }
            MapKind::Explicit(table) => {
                let after = table.iter().skip(old + 1).find_map(|m| *m);
                let before = table.iter().take(old).rev().find_map(|m| *m);
                after.or(before).map(|i| i.min(new_len - 1))
            }
        }
    }
}

impl FlattenedIndexMap {
    /// Compose this map with the one that followed it.
    ///
    /// The result is an explicit table over the `old_len` indices of the
    /// first index space.
    pub fn then(&self, next: &FlattenedIndexMap, old_len: usize) -> Self {
        Self::explicit(
            (0..old_len)
                .map(|old| {
                    self.map_old_to_new(old)
                        .and_then(|mid| next.map_old_to_new(mid))
                })
                .collect(),
        )
    }
}

/// A run of rows in an intermediate index space.
#[derive(Debug, Clone, Copy)]
enum Run {
    /// `len` rows carried over unchanged from old index `start`.
    Kept { start: usize, len: usize },
    /// `len` rows with no old counterpart.
    Fresh { len: usize },
}

/// Compose two shift change lists into one list over the first index space.
///
/// `first` is in old coordinates (`old_len` rows); `second` is in the
/// coordinates `first` produced. Rows untouched by both stay out of the
/// result, so consumers keeping per-row state (measured heights) lose only
/// the rows that actually changed.
pub(crate) fn compose_changes(
    first: &[FlattenedChange],
    second: &[FlattenedChange],
    old_len: usize,
) -> Vec<FlattenedChange> {
    let mut runs = Vec::with_capacity(first.len() * 2 + 1);
    let mut next = 0;
    for change in first {
        if change.index > next {
            runs.push(Run::Kept {
                start: next,
                len: change.index - next,
            });
        }
        if change.new_count > 0 {
            runs.push(Run::Fresh {
                len: change.new_count,
            });
        }
        next = next.max(change.old_end());
    }
    if old_len > next {
        runs.push(Run::Kept {
            start: next,
            len: old_len - next,
        });
    }

    for change in second.iter().rev() {
        runs = splice_runs(runs, change);
    }

    let mut changes = Vec::new();
    let mut next = 0;
    let mut fresh = 0;
    for run in runs {
        match run {
            Run::Fresh { len } => fresh += len,
            Run::Kept { start, len } => {
                if start > next || fresh > 0 {
                    changes.push(FlattenedChange::new(next, start - next, fresh));
                }
                next = start + len;
                fresh = 0;
            }
        }
    }
    if old_len > next || fresh > 0 {
        changes.push(FlattenedChange::new(next, old_len.saturating_sub(next), fresh));
    }
    changes
}

/// Replace `change.old_count` rows at `change.index` with fresh rows.
fn splice_runs(runs: Vec<Run>, change: &FlattenedChange) -> Vec<Run> {
    let mut out = Vec::with_capacity(runs.len() + 2);
    let mut position = 0;
    let mut inserted = false;
    let end = change.old_end();
    for run in runs {
        let len = match run {
            Run::Kept { len, .. } | Run::Fresh { len } => len,
        };
        let (run_start, run_end) = (position, position + len);
        position = run_end;

        // Keep the part before the change.
        let head = change.index.clamp(run_start, run_end) - run_start;
        if head > 0 {
            out.push(match run {
                Run::Kept { start, .. } => Run::Kept { start, len: head },
                Run::Fresh { .. } => Run::Fresh { len: head },
            });
        }
        if !inserted && run_end >= change.index && (run_end > change.index || end == change.index) {
            if change.new_count > 0 {
                out.push(Run::Fresh {
                    len: change.new_count,
                });
            }
            inserted = true;
        }
        // Keep the part after the change.
        let tail_from = end.clamp(run_start, run_end).max(run_start + head);
        if tail_from < run_end {
            let skip = tail_from - run_start;
            out.push(match run {
                Run::Kept { start, .. } => Run::Kept {
                    start: start + skip,
                    len: run_end - tail_from,
                },
                Run::Fresh { .. } => Run::Fresh {
                    len: run_end - tail_from,
                },
            });
        }
    }
    if !inserted && change.new_count > 0 {
        out.push(Run::Fresh {
            len: change.new_count,
        });
    }
    out
}

impl Default for FlattenedIndexMap {
    fn default() -> Self {
        Self::identity()
    }
}
