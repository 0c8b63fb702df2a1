//! Flat collection view with filtering, sorting, paging and currency.
//!
//! `CollectionView` owns a source vector and exposes a derived view: the
//! source rows that pass the filter, in comparator order. The view can be
//! split into pages; the grid displays one page at a time while the
//! selection model works against the whole (unpaged) view.
//!
//! Structural changes are reported on `collection_changed` in unpaged view
//! coordinates. While paging is active every structural change is reported as
//! `Reset`, because page contents shift wholesale.
//!
//! # Example
//!
//! ```
//! use lattice_grid::model::CollectionView;
//!
//! let view = CollectionView::new(vec![5, 3, 8, 1])
//!     .with_filter(|n: &i32| *n > 2)
//!     .with_sort(|a: &i32, b: &i32| a.cmp(b));
//! assert_eq!(view.view_items(), vec![3, 5, 8]);
//! ```

use std::cmp::Ordering;
use std::sync::Arc;

use lattice_grid_core::{CollectionChange, Signal};
use parking_lot::RwLock;

use super::traits::ItemSource;

/// Type alias for a filter function.
///
/// Returns `true` if the item should be included.
pub type FilterFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Type alias for a compare function for sorting.
pub type CompareFn<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

struct ViewState<T> {
    source: Vec<T>,
    /// View position -> source index.
    view_to_source: Vec<usize>,
    filter: Option<FilterFn<T>>,
    compare: Option<CompareFn<T>>,
    page_size: usize,
    page_index: usize,
    /// Current position, in page rows.
    current: Option<usize>,
}

impl<T: Clone + PartialEq> ViewState<T> {
    fn rebuild_mapping(&mut self) {
        let mut mapping: Vec<usize> = (0..self.source.len())
            .filter(|&i| {
                self.filter
                    .as_ref()
                    .is_none_or(|filter| filter(&self.source[i]))
            })
            .collect();
        if let Some(compare) = &self.compare {
            let source = &self.source;
            mapping.sort_by(|&a, &b| compare(&source[a], &source[b]));
        }
        self.view_to_source = mapping;
        self.clamp_page();
    }

    fn view_position_of_source(&self, source_index: usize) -> Option<usize> {
        self.view_to_source.iter().position(|&s| s == source_index)
    }

    fn is_paged(&self) -> bool {
        self.page_size > 0
    }

    fn page_count(&self) -> usize {
        if !self.is_paged() {
            return 1;
        }
        self.view_to_source.len().div_ceil(self.page_size).max(1)
    }

    fn clamp_page(&mut self) {
        self.page_index = self.page_index.min(self.page_count() - 1);
    }

    fn page_start(&self) -> usize {
        if self.is_paged() {
            self.page_index * self.page_size
        } else {
            0
        }
    }

    fn page_len(&self) -> usize {
        let total = self.view_to_source.len();
        if !self.is_paged() {
            return total;
        }
        total.saturating_sub(self.page_start()).min(self.page_size)
    }

    fn view_item(&self, position: usize) -> Option<&T> {
        self.view_to_source
            .get(position)
            .and_then(|&s| self.source.get(s))
    }

    fn page_item(&self, row: usize) -> Option<&T> {
        if row >= self.page_len() {
            return None;
        }
        self.view_item(self.page_start() + row)
    }

    fn page_row_of(&self, item: &T) -> Option<usize> {
        (0..self.page_len()).find(|&row| self.page_item(row) == Some(item))
    }
}

/// A filtered, sorted, optionally paged view over a vector of items.
pub struct CollectionView<T> {
    state: RwLock<ViewState<T>>,
    /// Emitted after every structural change to the view.
    pub collection_changed: Signal<CollectionChange<T>>,
    /// Emitted when the current position changes. Args: new page row.
    pub current_changed: Signal<Option<usize>>,
}

impl<T: Clone + PartialEq + Send + Sync + 'static> CollectionView<T> {
    /// Create a view over `items` with no filter, sort or paging.
    pub fn new(items: Vec<T>) -> Self {
        let mut state = ViewState {
            source: items,
            view_to_source: Vec::new(),
            filter: None,
            compare: None,
            page_size: 0,
            page_index: 0,
            current: None,
        };
        state.rebuild_mapping();
        Self {
            state: RwLock::new(state),
            collection_changed: Signal::new(),
            current_changed: Signal::new(),
        }
    }

    /// Sets a filter function.
    pub fn with_filter<F>(self, filter: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        {
            let mut state = self.state.write();
            state.filter = Some(Arc::new(filter));
            state.rebuild_mapping();
        }
        self
    }

    /// Sets a sort comparator.
    pub fn with_sort<F>(self, compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        {
            let mut state = self.state.write();
            state.compare = Some(Arc::new(compare));
            state.rebuild_mapping();
        }
        self
    }

    /// Sets the page size. Zero disables paging.
    pub fn with_page_size(self, page_size: usize) -> Self {
        {
            let mut state = self.state.write();
            state.page_size = page_size;
            state.clamp_page();
        }
        self
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Number of rows on the current page (the whole view when unpaged).
    pub fn count(&self) -> usize {
        self.state.read().page_len()
    }

    /// Item at `row` on the current page.
    pub fn get(&self, row: usize) -> Option<T> {
        self.state.read().page_item(row).cloned()
    }

    /// Page row of the first item equal to `item`.
    pub fn row_of(&self, item: &T) -> Option<usize> {
        self.state.read().page_row_of(item)
    }

    /// Items on the current page.
    pub fn page_items(&self) -> Vec<T> {
        let state = self.state.read();
        (0..state.page_len())
            .filter_map(|row| state.page_item(row).cloned())
            .collect()
    }

    /// Number of rows in the whole view.
    pub fn view_count(&self) -> usize {
        self.state.read().view_to_source.len()
    }

    /// All items in view order.
    pub fn view_items(&self) -> Vec<T> {
        let state = self.state.read();
        state
            .view_to_source
            .iter()
            .map(|&s| state.source[s].clone())
            .collect()
    }

    /// Number of items in the underlying source, including filtered ones.
    pub fn source_count(&self) -> usize {
        self.state.read().source.len()
    }

    // =========================================================================
    // Paging
    // =========================================================================

    /// Page size; zero when paging is disabled.
    pub fn page_size(&self) -> usize {
        self.state.read().page_size
    }

    /// Index of the displayed page.
    pub fn page_index(&self) -> usize {
        self.state.read().page_index
    }

    /// Number of pages (at least one).
    pub fn page_count(&self) -> usize {
        self.state.read().page_count()
    }

    /// View position of the first row on the current page.
    pub fn page_start(&self) -> usize {
        self.state.read().page_start()
    }

    /// Change the page size. Emits `Reset`.
    pub fn set_page_size(&self, page_size: usize) {
        {
            let mut state = self.state.write();
            if state.page_size == page_size {
                return;
            }
            state.page_size = page_size;
            state.clamp_page();
        }
        self.after_reset();
    }

    /// Display another page. Returns `false` if `page_index` is out of range.
    pub fn move_to_page(&self, page_index: usize) -> bool {
        {
            let mut state = self.state.write();
            if page_index >= state.page_count() {
                return false;
            }
            if state.page_index == page_index {
                return true;
            }
            state.page_index = page_index;
        }
        self.after_reset();
        true
    }

    // =========================================================================
    // Filtering and Sorting
    // =========================================================================

    /// Replace the filter. Emits `Reset`.
    pub fn set_filter(&self, filter: Option<FilterFn<T>>) {
        self.state.write().filter = filter;
        self.refresh();
    }

    /// Replace the sort comparator. Emits `Reset`.
    pub fn set_sort(&self, compare: Option<CompareFn<T>>) {
        self.state.write().compare = compare;
        self.refresh();
    }

    /// Returns `true` if a sort comparator is installed.
    pub fn is_sorted(&self) -> bool {
        self.state.read().compare.is_some()
    }

    /// Re-run the filter and sort. Emits `Reset`.
    pub fn refresh(&self) {
        self.state.write().rebuild_mapping();
        self.after_reset();
    }

    // =========================================================================
    // Currency
    // =========================================================================

    /// Current position, as a row on the current page.
    pub fn current_position(&self) -> Option<usize> {
        self.state.read().current
    }

    /// The current item.
    pub fn current_item(&self) -> Option<T> {
        let state = self.state.read();
        state.current.and_then(|row| state.page_item(row).cloned())
    }

    /// Move currency to `position`. Returns `false` if it is out of range.
    pub fn move_current_to_position(&self, position: Option<usize>) -> bool {
        let changed = {
            let mut state = self.state.write();
            if position.is_some_and(|p| p >= state.page_len()) {
                return false;
            }
            let changed = state.current != position;
            state.current = position;
            changed
        };
        if changed {
            self.current_changed.emit(position);
        }
        true
    }

    /// Move currency to the row holding `item`.
    pub fn move_current_to(&self, item: &T) -> bool {
        let Some(row) = self.row_of(item) else {
            return false;
        };
        self.move_current_to_position(Some(row))
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Append an item to the source.
    pub fn push(&self, item: T) {
        let index = self.source_count();
        self.insert(index, item);
    }

    /// Insert an item into the source at `source_index` (clamped).
    pub fn insert(&self, source_index: usize, item: T) {
        let change = {
            let mut state = self.state.write();
            let source_index = source_index.min(state.source.len());
            state.source.insert(source_index, item.clone());
            state.rebuild_mapping();
            let position = state.view_position_of_source(source_index);
            Self::shift_current_for_insert(&mut state, position);
            position.map(|index| CollectionChange::Add {
                index,
                items: vec![item],
            })
        };
        self.emit_structural(change);
    }

    /// Remove the first source item equal to `item`.
    pub fn remove(&self, item: &T) -> bool {
        let source_index = self.state.read().source.iter().position(|i| i == item);
        match source_index {
            Some(index) => self.remove_at(index).is_some(),
            None => false,
        }
    }

    /// Remove the source item at `source_index`.
    pub fn remove_at(&self, source_index: usize) -> Option<T> {
        let (removed, change) = {
            let mut state = self.state.write();
            if source_index >= state.source.len() {
                return None;
            }
            let position = state.view_position_of_source(source_index);
            let removed = state.source.remove(source_index);
            state.rebuild_mapping();
            Self::shift_current_for_remove(&mut state, position);
            let change = position.map(|index| CollectionChange::Remove {
                index,
                items: vec![removed.clone()],
            });
            (removed, change)
        };
        self.emit_structural(change);
        Some(removed)
    }

    /// Replace the source item at `source_index`.
    ///
    /// Reported as `Replace` when the item keeps its view position, and as
    /// `Reset` when filtering or sorting moved it.
    pub fn replace(&self, source_index: usize, item: T) -> Option<T> {
        let (old, change) = {
            let mut state = self.state.write();
            if source_index >= state.source.len() {
                return None;
            }
            let before = state.view_position_of_source(source_index);
            let old = std::mem::replace(&mut state.source[source_index], item.clone());
            state.rebuild_mapping();
            let after = state.view_position_of_source(source_index);
            let change = match (before, after) {
                (Some(b), Some(a)) if a == b => Some(CollectionChange::Replace {
                    index: a,
                    old_items: vec![old.clone()],
                    new_items: vec![item],
                }),
                (None, None) => None,
                _ => Some(CollectionChange::Reset),
            };
            (old, change)
        };
        self.emit_structural(change);
        Some(old)
    }

    /// Move a source item. Not available while sorted, since the comparator
    /// decides order.
    pub fn move_item(&self, old_source_index: usize, new_source_index: usize) -> bool {
        let change = {
            let mut state = self.state.write();
            let len = state.source.len();
            if state.compare.is_some() || old_source_index >= len || new_source_index >= len {
                return false;
            }
            if old_source_index == new_source_index {
                return true;
            }
            let old_position = state.view_position_of_source(old_source_index);
            let item = state.source.remove(old_source_index);
            state.source.insert(new_source_index, item.clone());
            state.rebuild_mapping();
            let new_position = state.view_position_of_source(new_source_index);
            match (old_position, new_position) {
                (Some(old_index), Some(new_index)) if old_index != new_index => {
                    Self::shift_current_for_remove(&mut state, Some(old_index));
                    Self::shift_current_for_insert(&mut state, Some(new_index));
                    Some(CollectionChange::Move {
                        old_index,
                        new_index,
                        items: vec![item],
                    })
                }
                _ => None,
            }
        };
        self.emit_structural(change);
        true
    }

    /// Replace the whole source. Emits `Reset`.
    pub fn reset(&self, items: Vec<T>) {
        {
            let mut state = self.state.write();
            state.source = items;
            state.rebuild_mapping();
        }
        self.after_reset();
    }

    fn shift_current_for_insert(state: &mut ViewState<T>, position: Option<usize>) {
        if state.is_paged() {
            return;
        }
        if let (Some(current), Some(position)) = (state.current, position)
            && position <= current
        {
            state.current = Some(current + 1);
        }
    }

    fn shift_current_for_remove(state: &mut ViewState<T>, position: Option<usize>) {
        if state.is_paged() {
            return;
        }
        if let (Some(current), Some(position)) = (state.current, position) {
            state.current = match position.cmp(&current) {
                Ordering::Less => Some(current - 1),
                Ordering::Equal => None,
                Ordering::Greater => Some(current),
            };
        }
    }

    fn emit_structural(&self, change: Option<CollectionChange<T>>) {
        let Some(change) = change else {
            return;
        };
        if self.state.read().is_paged() {
            self.after_reset();
        } else {
            self.collection_changed.emit(change);
        }
    }

    /// Emit `Reset`, then drop currency if the current row left the page.
    fn after_reset(&self) {
        let current_cleared = {
            let mut state = self.state.write();
            let cleared = state.current.is_some_and(|row| row >= state.page_len());
            if cleared {
                state.current = None;
            }
            cleared
        };
        self.collection_changed.emit(CollectionChange::Reset);
        if current_cleared {
            self.current_changed.emit(None);
        }
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> ItemSource<T> for CollectionView<T> {
    fn len(&self) -> usize {
        self.view_count()
    }

    fn item(&self, index: usize) -> Option<T> {
        self.state.read().view_item(index).cloned()
    }

    fn index_of(&self, item: &T) -> Option<usize> {
        let state = self.state.read();
        state
            .view_to_source
            .iter()
            .position(|&s| state.source[s] == *item)
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Default for CollectionView<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

static_assertions::assert_impl_all!(CollectionView<String>: Send, Sync);
