//! Index-based selection model.
//!
//! A [`SelectionModel`] tracks selected positions in an [`ItemSource`]. The
//! grid drives one (its own default [`IndexSelectionModel`], or one supplied
//! by the host) and listens to its signals to pick up changes made by other
//! parties.
//!
//! # Signals
//!
//! - `selection_changed`: net selection delta, once per outermost operation
//! - `indexes_changed`: selected indexes shifted because the source changed
//! - `lost_selection`: selected items were removed from the source
//! - `source_reset`: the source was reset and the selection cleared
//! - `property_changed`: `source`, `single_select` or `selected_index` changed
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use lattice_grid::model::{IndexSelectionModel, ItemSource, SelectionModel, VecSource};
//!
//! let source: Arc<dyn ItemSource<&str>> = Arc::new(VecSource::new(vec!["a", "b", "c"]));
//! let model = IndexSelectionModel::new();
//! model.set_source(Some(source));
//! model.set_single_select(false);
//!
//! model.begin_batch_update();
//! model.select(0);
//! model.select(2);
//! model.end_batch_update().unwrap();
//!
//! assert_eq!(model.selected_items(), vec!["a", "c"]);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lattice_grid_core::Signal;
use lattice_grid_core::logging::targets;
use parking_lot::RwLock;

use super::traits::ItemSource;
use crate::error::{GridError, Result};

/// Net selection delta reported by `selection_changed`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionModelChange<T> {
    /// Indexes that became selected, ascending.
    pub selected_indexes: Vec<usize>,
    /// Indexes that became deselected, ascending.
    pub deselected_indexes: Vec<usize>,
    /// Items at `selected_indexes`.
    pub selected_items: Vec<T>,
    /// Items that were at `deselected_indexes`, where still known.
    pub deselected_items: Vec<T>,
}

impl<T> SelectionModelChange<T> {
    /// Returns `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.selected_indexes.is_empty() && self.deselected_indexes.is_empty()
    }
}

/// Shift of selected indexes caused by a source insertion or removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexesChange {
    /// First source index affected.
    pub start: usize,
    /// Amount selected indexes at or after `start` moved by.
    pub delta: isize,
}

/// Properties reported by `property_changed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionModelProperty {
    /// The item source was replaced.
    Source,
    /// Single-select mode was toggled.
    SingleSelect,
    /// The primary selected index changed.
    SelectedIndex,
}

/// Signals every selection model exposes.
pub struct SelectionModelSignals<T> {
    /// Net selection delta.
    pub selection_changed: Signal<SelectionModelChange<T>>,
    /// Selected indexes shifted.
    pub indexes_changed: Signal<IndexesChange>,
    /// Selected items were removed from the source.
    pub lost_selection: Signal<()>,
    /// The source was reset.
    pub source_reset: Signal<()>,
    /// A model property changed.
    pub property_changed: Signal<SelectionModelProperty>,
}

impl<T: 'static> SelectionModelSignals<T> {
    /// Create a set of unconnected signals.
    pub fn new() -> Self {
        Self {
            selection_changed: Signal::new(),
            indexes_changed: Signal::new(),
            lost_selection: Signal::new(),
            source_reset: Signal::new(),
            property_changed: Signal::new(),
        }
    }
}

impl<T: 'static> Default for SelectionModelSignals<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Contract for pluggable selection models.
///
/// All methods take `&self`; implementations use interior mutability and
/// must emit signals only after releasing their internal locks, because
/// slots read the model back.
pub trait SelectionModel<T>: Send + Sync {
    /// The model's signals.
    fn signals(&self) -> &SelectionModelSignals<T>;

    /// The item source.
    fn source(&self) -> Option<Arc<dyn ItemSource<T>>>;

    /// Replace the item source. Clears the selection.
    fn set_source(&self, source: Option<Arc<dyn ItemSource<T>>>);

    /// Returns `true` if at most one index may be selected.
    fn single_select(&self) -> bool;

    /// Switch single-select mode. Entering single-select keeps only the
    /// primary selected index.
    fn set_single_select(&self, single_select: bool);

    /// The primary selected index.
    fn selected_index(&self) -> Option<usize>;

    /// Replace the selection with `index` (or clear it).
    fn set_selected_index(&self, index: Option<usize>);

    /// All selected indexes, ascending.
    fn selected_indexes(&self) -> Vec<usize>;

    /// Returns `true` if `index` is selected.
    fn is_selected(&self, index: usize) -> bool;

    /// Select `index`.
    fn select(&self, index: usize);

    /// Deselect `index`.
    fn deselect(&self, index: usize);

    /// Select the closed range `[start, end]`.
    fn select_range(&self, start: usize, end: usize);

    /// Deselect the closed range `[start, end]`.
    fn deselect_range(&self, start: usize, end: usize);

    /// Select every index in the source.
    fn select_all(&self);

    /// Deselect everything.
    fn clear(&self);

    /// Start coalescing notifications. Calls nest.
    fn begin_batch_update(&self);

    /// Finish a batch. The outermost call emits the net change.
    fn end_batch_update(&self) -> Result<()>;

    /// `count` items were inserted into the source at `index`.
    fn on_source_items_inserted(&self, index: usize, count: usize);

    /// `count` items were removed from the source at `index`.
    fn on_source_items_removed(&self, index: usize, count: usize);

    /// The source was reset.
    fn on_source_reset(&self);

    /// Returns `true` while a grid is driving this model.
    fn is_attached(&self) -> bool;

    /// Mark the model as driven (or released) by a grid.
    fn set_attached(&self, attached: bool);

    /// The item at the primary selected index.
    fn selected_item(&self) -> Option<T> {
        let index = self.selected_index()?;
        self.source()?.item(index)
    }

    /// Items at all selected indexes.
    fn selected_items(&self) -> Vec<T> {
        let Some(source) = self.source() else {
            return Vec::new();
        };
        self.selected_indexes()
            .into_iter()
            .filter_map(|i| source.item(i))
            .collect()
    }
}

struct Pending<T> {
    selected: BTreeSet<usize>,
    deselected: BTreeMap<usize, Option<T>>,
    index_changed: bool,
}

impl<T> Default for Pending<T> {
    fn default() -> Self {
        Self {
            selected: BTreeSet::new(),
            deselected: BTreeMap::new(),
            index_changed: false,
        }
    }
}

impl<T> Pending<T> {
    fn record_select(&mut self, index: usize) {
        if self.deselected.remove(&index).is_none() {
            self.selected.insert(index);
        }
    }

    fn record_deselect(&mut self, index: usize, item: Option<T>) {
        if !self.selected.remove(&index) {
            self.deselected.insert(index, item);
        }
    }

    fn is_empty(&self) -> bool {
        self.selected.is_empty() && self.deselected.is_empty() && !self.index_changed
    }
}

struct ModelState<T> {
    source: Option<Arc<dyn ItemSource<T>>>,
    single_select: bool,
    selected: BTreeSet<usize>,
    selected_index: Option<usize>,
    batch_depth: usize,
    pending: Pending<T>,
}

/// Notifications collected under the lock and emitted after it is released.
struct Outgoing<T> {
    change: Option<SelectionModelChange<T>>,
    index_changed: bool,
}

impl<T: Clone> ModelState<T> {
    fn in_range(&self, index: usize) -> bool {
        self.source.as_ref().is_none_or(|s| index < s.len())
    }

    fn item(&self, index: usize) -> Option<T> {
        self.source.as_ref().and_then(|s| s.item(index))
    }

    fn set_primary(&mut self, index: Option<usize>) {
        if self.selected_index != index {
            self.selected_index = index;
            self.pending.index_changed = true;
        }
    }

    fn add(&mut self, index: usize) {
        if !self.in_range(index) {
            return;
        }
        if self.single_select {
            self.remove_all_except(index);
        }
        if self.selected.insert(index) {
            self.pending.record_select(index);
        }
        if self.single_select || self.selected_index.is_none() {
            self.set_primary(Some(index));
        }
    }

    fn remove(&mut self, index: usize) {
        if self.selected.remove(&index) {
            let item = self.item(index);
            self.pending.record_deselect(index, item);
            if self.selected_index == Some(index) {
                let next = self.selected.iter().next().copied();
                self.set_primary(next);
            }
        }
    }

    fn remove_all_except(&mut self, keep: usize) {
        let others: Vec<usize> = self.selected.iter().copied().filter(|&i| i != keep).collect();
        for index in others {
            self.remove(index);
        }
    }

    fn remove_all(&mut self) {
        let all: Vec<usize> = self.selected.iter().copied().collect();
        for index in all {
            self.remove(index);
        }
        self.set_primary(None);
    }

    fn take_outgoing(&mut self) -> Option<Outgoing<T>> {
        if self.batch_depth > 0 || self.pending.is_empty() {
            return None;
        }
        let pending = std::mem::take(&mut self.pending);
        let selected_indexes: Vec<usize> = pending.selected.into_iter().collect();
        let selected_items = selected_indexes
            .iter()
            .filter_map(|&i| self.item(i))
            .collect();
        let (deselected_indexes, deselected_items): (Vec<usize>, Vec<Option<T>>) =
            pending.deselected.into_iter().unzip();
        let change = SelectionModelChange {
            selected_indexes,
            deselected_indexes,
            selected_items,
            deselected_items: deselected_items.into_iter().flatten().collect(),
        };
        Some(Outgoing {
            change: (!change.is_empty()).then_some(change),
            index_changed: pending.index_changed,
        })
    }
}

/// The default [`SelectionModel`], backed by an ordered index set.
pub struct IndexSelectionModel<T> {
    state: RwLock<ModelState<T>>,
    attached: AtomicBool,
    signals: SelectionModelSignals<T>,
}

impl<T: Clone + Send + Sync + 'static> IndexSelectionModel<T> {
    /// Create a single-select model with no source.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ModelState {
                source: None,
                single_select: true,
                selected: BTreeSet::new(),
                selected_index: None,
                batch_depth: 0,
                pending: Pending::default(),
            }),
            attached: AtomicBool::new(false),
            signals: SelectionModelSignals::new(),
        }
    }

    /// Create a model with the given source and mode.
    pub fn with_source(source: Arc<dyn ItemSource<T>>, single_select: bool) -> Self {
        let model = Self::new();
        {
            let mut state = model.state.write();
            state.source = Some(source);
            state.single_select = single_select;
        }
        model
    }

    /// Returns `true` inside `begin_batch_update`/`end_batch_update`.
    pub fn is_batch_updating(&self) -> bool {
        self.state.read().batch_depth > 0
    }

    fn mutate<F>(&self, f: F)
    where
        F: FnOnce(&mut ModelState<T>),
    {
        let outgoing = {
            let mut state = self.state.write();
            f(&mut state);
            state.take_outgoing()
        };
        self.emit(outgoing);
    }

    fn emit(&self, outgoing: Option<Outgoing<T>>) {
        let Some(outgoing) = outgoing else {
            return;
        };
        if let Some(change) = outgoing.change {
            tracing::trace!(
                target: targets::SELECTION,
                selected = change.selected_indexes.len(),
                deselected = change.deselected_indexes.len(),
                "selection model changed"
            );
            self.signals.selection_changed.emit(change);
        }
        if outgoing.index_changed {
            self.signals
                .property_changed
                .emit(SelectionModelProperty::SelectedIndex);
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Default for IndexSelectionModel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> SelectionModel<T> for IndexSelectionModel<T> {
    fn signals(&self) -> &SelectionModelSignals<T> {
        &self.signals
    }

    fn source(&self) -> Option<Arc<dyn ItemSource<T>>> {
        self.state.read().source.clone()
    }

    fn set_source(&self, source: Option<Arc<dyn ItemSource<T>>>) {
        let same = {
            let state = self.state.read();
            match (&state.source, &source) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
        };
        if same {
            return;
        }
        self.mutate(|state| {
            state.remove_all();
            state.source = source;
        });
        self.signals
            .property_changed
            .emit(SelectionModelProperty::Source);
    }

    fn single_select(&self) -> bool {
        self.state.read().single_select
    }

    fn set_single_select(&self, single_select: bool) {
        let changed = {
            let state = self.state.read();
            state.single_select != single_select
        };
        if !changed {
            return;
        }
        self.mutate(|state| {
            state.single_select = single_select;
            if single_select {
                match state.selected_index {
                    Some(keep) => state.remove_all_except(keep),
                    None => state.remove_all(),
                }
            }
        });
        self.signals
            .property_changed
            .emit(SelectionModelProperty::SingleSelect);
    }

    fn selected_index(&self) -> Option<usize> {
        self.state.read().selected_index
    }

    fn set_selected_index(&self, index: Option<usize>) {
        self.mutate(|state| match index {
            Some(i) if state.in_range(i) => {
                state.remove_all_except(i);
                state.add(i);
                state.set_primary(Some(i));
            }
            Some(_) => {}
            None => state.remove_all(),
        });
    }

    fn selected_indexes(&self) -> Vec<usize> {
        self.state.read().selected.iter().copied().collect()
    }

    fn is_selected(&self, index: usize) -> bool {
        self.state.read().selected.contains(&index)
    }

    fn select(&self, index: usize) {
        self.mutate(|state| state.add(index));
    }

    fn deselect(&self, index: usize) {
        self.mutate(|state| state.remove(index));
    }

    fn select_range(&self, start: usize, end: usize) {
        let (lo, hi) = (start.min(end), start.max(end));
        self.mutate(|state| {
            if state.single_select {
                state.add(end);
                return;
            }
            for index in lo..=hi {
                state.add(index);
            }
        });
    }

    fn deselect_range(&self, start: usize, end: usize) {
        let (lo, hi) = (start.min(end), start.max(end));
        self.mutate(|state| {
            let hits: Vec<usize> = state.selected.range(lo..=hi).copied().collect();
            for index in hits {
                state.remove(index);
            }
        });
    }

    fn select_all(&self) {
        self.mutate(|state| {
            if state.single_select {
                return;
            }
            let Some(len) = state.source.as_ref().map(|s| s.len()) else {
                return;
            };
            for index in 0..len {
                state.add(index);
            }
        });
    }

    fn clear(&self) {
        self.mutate(|state| state.remove_all());
    }

    fn begin_batch_update(&self) {
        self.state.write().batch_depth += 1;
    }

    fn end_batch_update(&self) -> Result<()> {
        let outgoing = {
            let mut state = self.state.write();
            if state.batch_depth == 0 {
                return Err(GridError::BatchUpdateNotStarted);
            }
            state.batch_depth -= 1;
            state.take_outgoing()
        };
        self.emit(outgoing);
        Ok(())
    }

    fn on_source_items_inserted(&self, index: usize, count: usize) {
        if count == 0 {
            return;
        }
        let shifted = {
            let mut state = self.state.write();
            let moved: Vec<usize> = state.selected.range(index..).copied().collect();
            for i in &moved {
                state.selected.remove(i);
            }
            state.selected.extend(moved.iter().map(|i| i + count));
            if let Some(primary) = state.selected_index
                && primary >= index
            {
                state.selected_index = Some(primary + count);
            }
            !moved.is_empty()
        };
        if shifted {
            self.signals.indexes_changed.emit(IndexesChange {
                start: index,
                delta: count as isize,
            });
        }
    }

    fn on_source_items_removed(&self, index: usize, count: usize) {
        if count == 0 {
            return;
        }
        let end = index + count;
        let (lost, shifted) = {
            let mut state = self.state.write();
            let lost: Vec<usize> = state.selected.range(index..end).copied().collect();
            let moved: Vec<usize> = state.selected.range(end..).copied().collect();
            for i in lost.iter().chain(moved.iter()) {
                state.selected.remove(i);
            }
            state.selected.extend(moved.iter().map(|i| i - count));
            state.selected_index = match state.selected_index {
                Some(p) if p >= end => Some(p - count),
                Some(p) if p >= index => state.selected.iter().next().copied(),
                other => other,
            };
            (lost, !moved.is_empty())
        };
        if !lost.is_empty() {
            tracing::debug!(
                target: targets::SELECTION,
                lost = lost.len(),
                "selected items removed from source"
            );
            self.signals.selection_changed.emit(SelectionModelChange {
                selected_indexes: Vec::new(),
                deselected_indexes: lost,
                selected_items: Vec::new(),
                deselected_items: Vec::new(),
            });
            self.signals.lost_selection.emit(());
        }
        if shifted {
            self.signals.indexes_changed.emit(IndexesChange {
                start: end,
                delta: -(count as isize),
            });
        }
    }

    fn on_source_reset(&self) {
        let had_index = {
            let mut state = self.state.write();
            state.selected.clear();
            state.pending = Pending::default();
            state.selected_index.take().is_some()
        };
        self.signals.source_reset.emit(());
        if had_index {
            self.signals
                .property_changed
                .emit(SelectionModelProperty::SelectedIndex);
        }
    }

    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    fn set_attached(&self, attached: bool) {
        self.attached.store(attached, Ordering::SeqCst);
    }
}

static_assertions::assert_impl_all!(IndexSelectionModel<String>: Send, Sync);
