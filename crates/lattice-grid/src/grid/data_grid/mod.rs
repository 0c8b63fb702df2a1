//! The data grid's selection and currency engine.
//!
//! This module provides [`DataGrid`], which keeps three views of "what is
//! selected" in agreement:
//!
//! - the pluggable [`SelectionModel`](crate::model::SelectionModel), indexed
//!   by source position
//! - the grid's own slot-indexed selection, which also covers cells, row
//!   headers and columns
//! - optional external lists bound with the `bind_*` methods
//!
//! Every mutation runs inside a change scope. Nested scopes only record
//! state; the outermost scope flushes once, emitting a single net event per
//! kind and writing bound lists.
//!
//! Model and data-source notifications never touch the grid directly. They
//! are queued and applied by [`DataGrid::dispatch_pending`], which the host
//! calls from its event loop. Low-priority work (auto-scroll, pointer-over
//! refresh, anchor hint expiry) is posted to a task queue and run by
//! [`DataGrid::run_deferred`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use lattice_grid::grid::{DataGrid, SelectionGesture};
//! use lattice_grid::model::CollectionView;
//!
//! let view = Arc::new(CollectionView::new(vec!["a", "b", "c", "d"]));
//! let mut grid = DataGrid::new().with_data_source(view.into());
//! grid.add_column("Name");
//!
//! grid.click_cell(1, None, SelectionGesture::plain());
//! grid.click_cell(3, None, SelectionGesture::shift());
//! assert_eq!(grid.selected_items(), vec!["b", "c", "d"]);
//! ```

mod anchor;
mod bindings;
mod dispatch;
mod flush;
mod model_sync;
mod orchestrator;
mod scrolling;
mod source_changes;

use lattice_grid_core::logging::targets;
use lattice_grid_core::{
    CoalescingToken, ConnectionGuard, DeferCounter, Property, Signal, SyncFlag, TaskQueue,
};

pub use anchor::HierarchicalAnchor;

use super::adapter::SelectionModelAdapter;
use super::binding::Bindings;
use super::cells::{CellInfo, CellSelection};
use super::columns::{Column, ColumnId, Columns};
use super::data::DataSource;
use super::events::{
    CellCoordinate, CurrentCellChangedEventArgs, SelectedCellsChangedEventArgs,
    SelectedColumnsChangedEventArgs, SelectionChangedEventArgs,
};
use super::hosts::{EditingHost, ScrollHost};
use super::message::Inbox;
use super::selected_items::SelectedItemsCollection;
use super::selection::{SelectionMode, SelectionUnit};
use super::slots::{GroupSpec, RowGroupInfo, SlotLayout};
use super::viewport::{RowVisualState, Viewport};
use crate::error::{GridError, Result};
use crate::model::{DEFAULT_ROW_HEIGHT, GridItem, RowHeightEstimator};

/// Grid-wide settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridOptions {
    /// Single or extended selection.
    pub selection_mode: SelectionMode,
    /// What a click selects.
    pub selection_unit: SelectionUnit,
    /// Uniform row height used when no estimator is installed.
    pub row_height_estimate: f64,
    /// Scroll the selection into view after it changes.
    pub auto_scroll_to_selected: bool,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            selection_mode: SelectionMode::Extended,
            selection_unit: SelectionUnit::FullRow,
            row_height_estimate: DEFAULT_ROW_HEIGHT,
            auto_scroll_to_selected: false,
        }
    }
}

/// A virtualized data grid's selection, currency and scroll state.
///
/// # Signals
///
/// - `selection_changed`: items added to and removed from the selection
/// - `selected_cells_changed`: cells added and removed
/// - `selected_columns_changed`: columns that became or stopped being fully
///   selected
/// - `current_cell_changed`: old and new current cell
/// - `selected_index_changed` / `selected_item_changed`: the primary
///   selection
pub struct DataGrid<T: GridItem> {
    // Data
    source: Option<DataSource<T>>,
    rows: Vec<T>,
    layout: SlotLayout,
    columns: Columns,
    source_connections: Vec<ConnectionGuard>,

    // Selection
    options: GridOptions,
    adapter: SelectionModelAdapter<T>,
    selected_items: SelectedItemsCollection<T>,
    cells: CellSelection<T>,
    anchor_slot: Option<usize>,
    anchor_column: Option<usize>,
    current: CellCoordinate,
    flushed_current: CellCoordinate,
    flushed_columns: Vec<ColumnId>,
    model_snapshot: Vec<T>,
    no_selection_change: DeferCounter,
    no_current_cell_change: DeferCounter,
    syncing_currency: SyncFlag,
    selected_item: Property<Option<T>>,
    selected_index: Property<Option<usize>>,
    bindings: Bindings<T>,

    // Scrolling
    viewport: Viewport,
    estimator: Option<Box<dyn RowHeightEstimator>>,
    anchor_hint: Option<usize>,
    last_anchor: Option<HierarchicalAnchor>,

    // Hosts
    editing_host: Option<Box<dyn EditingHost>>,
    scroll_host: Option<Box<dyn ScrollHost>>,

    // Visual state
    row_states: Vec<(usize, RowVisualState)>,
    visual_refresh_count: usize,
    pointer_y: Option<f64>,
    pointer_over_slot: Option<usize>,

    // Dispatch
    inbox: Inbox<T>,
    tasks: TaskQueue<DataGrid<T>>,
    auto_scroll_token: CoalescingToken,
    pointer_token: CoalescingToken,
    anchor_hint_token: CoalescingToken,

    // Signals
    /// Emitted once per outermost change with the net item delta.
    pub selection_changed: Signal<SelectionChangedEventArgs<T>>,
    /// Emitted once per outermost change with the net cell delta.
    pub selected_cells_changed: Signal<SelectedCellsChangedEventArgs<T>>,
    /// Emitted when the set of fully selected columns changes.
    pub selected_columns_changed: Signal<SelectedColumnsChangedEventArgs>,
    /// Emitted when the current cell moves.
    pub current_cell_changed: Signal<CurrentCellChangedEventArgs>,
    /// Emitted when the primary selected row changes. Args: row index.
    pub selected_index_changed: Signal<Option<usize>>,
    /// Emitted when the primary selected item changes.
    pub selected_item_changed: Signal<Option<T>>,
}

impl<T: GridItem> Default for DataGrid<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: GridItem> DataGrid<T> {
    /// Creates an empty grid with its own selection model.
    pub fn new() -> Self {
        let options = GridOptions::default();
        let inbox = Inbox::new();
        let adapter = SelectionModelAdapter::with_default_model(
            options.selection_mode == SelectionMode::Single,
            inbox.sender(),
        );

        Self {
            source: None,
            rows: Vec::new(),
            layout: SlotLayout::default(),
            columns: Columns::new(),
            source_connections: Vec::new(),
            options,
            adapter,
            selected_items: SelectedItemsCollection::new(),
            cells: CellSelection::new(),
            anchor_slot: None,
            anchor_column: None,
            current: CellCoordinate::none(),
            flushed_current: CellCoordinate::none(),
            flushed_columns: Vec::new(),
            model_snapshot: Vec::new(),
            no_selection_change: DeferCounter::new("no_selection_change"),
            no_current_cell_change: DeferCounter::new("no_current_cell_change"),
            syncing_currency: SyncFlag::new("currency"),
            selected_item: Property::new(None),
            selected_index: Property::new(None),
            bindings: Bindings::default(),
            viewport: Viewport::default(),
            estimator: None,
            anchor_hint: None,
            last_anchor: None,
            editing_host: None,
            scroll_host: None,
            row_states: Vec::new(),
            visual_refresh_count: 0,
            pointer_y: None,
            pointer_over_slot: None,
            inbox,
            tasks: TaskQueue::new(),
            auto_scroll_token: CoalescingToken::new(),
            pointer_token: CoalescingToken::new(),
            anchor_hint_token: CoalescingToken::new(),
            selection_changed: Signal::new(),
            selected_cells_changed: Signal::new(),
            selected_columns_changed: Signal::new(),
            current_cell_changed: Signal::new(),
            selected_index_changed: Signal::new(),
            selected_item_changed: Signal::new(),
        }
    }

    // =========================================================================
    // Builder Methods
    // =========================================================================

    /// Sets the data source using builder pattern.
    pub fn with_data_source(mut self, source: DataSource<T>) -> Self {
        self.set_data_source(Some(source));
        self
    }

    /// Sets the selection mode using builder pattern.
    pub fn with_selection_mode(mut self, mode: SelectionMode) -> Self {
        self.set_selection_mode(mode);
        self
    }

    /// Sets the selection unit using builder pattern.
    pub fn with_selection_unit(mut self, unit: SelectionUnit) -> Self {
        self.set_selection_unit(unit);
        self
    }

    /// Sets the uniform row height estimate using builder pattern.
    pub fn with_row_height_estimate(mut self, height: f64) -> Self {
        self.options.row_height_estimate = height.max(1.0);
        self
    }

    /// Enables scrolling the selection into view using builder pattern.
    pub fn with_auto_scroll_to_selected(mut self, enabled: bool) -> Self {
        self.options.auto_scroll_to_selected = enabled;
        self
    }

    /// Installs a row height estimator using builder pattern.
    pub fn with_row_height_estimator(mut self, mut estimator: Box<dyn RowHeightEstimator>) -> Self {
        estimator.on_data_source_changed(self.layout.slot_count());
        self.estimator = Some(estimator);
        self
    }

    /// Installs the host's cell editor using builder pattern.
    pub fn with_editing_host(mut self, host: Box<dyn EditingHost>) -> Self {
        self.editing_host = Some(host);
        self
    }

    /// Installs the host's scroll container using builder pattern.
    pub fn with_scroll_host(mut self, host: Box<dyn ScrollHost>) -> Self {
        self.scroll_host = Some(host);
        self
    }

    // =========================================================================
    // Options
    // =========================================================================

    /// The grid's options.
    pub fn options(&self) -> &GridOptions {
        &self.options
    }

    /// The selection mode.
    pub fn selection_mode(&self) -> SelectionMode {
        self.options.selection_mode
    }

    /// Sets the selection mode. Changing it clears the selection.
    pub fn set_selection_mode(&mut self, mode: SelectionMode) {
        if self.options.selection_mode == mode {
            return;
        }
        self.options.selection_mode = mode;
        let scope = self.begin_change();
        self.clear_selection_state();
        self.adapter.set_single_select(mode == SelectionMode::Single);
        self.end_change(scope);
    }

    /// The selection unit.
    pub fn selection_unit(&self) -> SelectionUnit {
        self.options.selection_unit
    }

    /// Sets the selection unit. Changing it clears the selection.
    pub fn set_selection_unit(&mut self, unit: SelectionUnit) {
        if self.options.selection_unit == unit {
            return;
        }
        self.options.selection_unit = unit;
        let scope = self.begin_change();
        self.clear_selection_state();
        self.end_change(scope);
    }

    /// Replaces the editing host.
    pub fn set_editing_host(&mut self, host: Option<Box<dyn EditingHost>>) {
        self.editing_host = host;
    }

    /// Replaces the scroll host.
    pub fn set_scroll_host(&mut self, host: Option<Box<dyn ScrollHost>>) {
        self.scroll_host = host;
    }

    // =========================================================================
    // Data
    // =========================================================================

    /// The data source.
    pub fn data_source(&self) -> Option<&DataSource<T>> {
        self.source.as_ref()
    }

    /// Number of displayed data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of slots: data rows plus group headers and footers.
    pub fn slot_count(&self) -> usize {
        self.layout.slot_count()
    }

    /// The displayed rows, as last applied.
    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    /// Item displayed at `slot`.
    pub fn item_at_slot(&self, slot: usize) -> Option<T> {
        self.layout
            .row_index_from_slot(slot)
            .and_then(|row| self.rows.get(row).cloned())
    }

    /// Slot displaying `item`.
    pub fn slot_of_item(&self, item: &T) -> Option<usize> {
        let row = self.rows.iter().position(|r| r == item)?;
        self.layout.slot_from_row_index(row)
    }

    // =========================================================================
    // Slots
    // =========================================================================

    /// Slot of a row index.
    pub fn slot_from_row_index(&self, row: usize) -> Option<usize> {
        self.layout.slot_from_row_index(row)
    }

    /// Row index of a slot. Group slots have none.
    pub fn row_index_from_slot(&self, slot: usize) -> Option<usize> {
        self.layout.row_index_from_slot(slot)
    }

    /// Selection-model index of a slot.
    pub fn selection_index_from_slot(&self, slot: usize) -> Option<usize> {
        self.layout.selection_index_from_slot(slot)
    }

    /// Slot of a selection-model index.
    pub fn slot_from_selection_index(&self, index: usize) -> Option<usize> {
        self.layout.slot_from_selection_index(index)
    }

    /// Returns `true` if `slot` is a group header or footer.
    pub fn is_group_slot(&self, slot: usize) -> bool {
        self.layout.is_group_slot(slot)
    }

    /// Returns `true` if `slot` cannot be targeted by selection.
    pub fn is_slot_out_of_bounds(&self, slot: isize) -> bool {
        self.layout.is_slot_out_of_bounds(slot)
    }

    /// Group info for a header or footer slot.
    pub fn group_info_for_slot(&self, slot: usize) -> Option<&RowGroupInfo> {
        self.layout.group_info_for_slot(slot)
    }

    /// Group the displayed rows.
    ///
    /// The group sizes must add up to the row count. Selection and currency
    /// follow their rows to the new slots.
    pub fn set_row_groups(&mut self, groups: &[GroupSpec]) -> Result<()> {
        let total: usize = groups.iter().map(|g| g.row_count).sum();
        if total != self.rows.len() {
            return Err(GridError::invalid_operation(format!(
                "row groups cover {total} rows but the grid has {}",
                self.rows.len()
            )));
        }
        let mut layout = SlotLayout::with_groups(groups);
        layout.set_selection_offset(self.layout.selection_offset());
        self.relayout(layout);
        Ok(())
    }

    /// Remove all row groups.
    pub fn clear_row_groups(&mut self) {
        if !self.layout.is_grouped() {
            return;
        }
        let mut layout = SlotLayout::new(self.rows.len());
        layout.set_selection_offset(self.layout.selection_offset());
        self.relayout(layout);
    }

    /// Collapse or expand a row group. Returns `true` if its state changed.
    ///
    /// If the current cell becomes hidden, currency moves to the group's
    /// header.
    pub fn set_group_collapsed(&mut self, group: usize, collapsed: bool) -> bool {
        if !self.layout.set_group_collapsed(group, collapsed) {
            return false;
        }
        let scope = self.begin_change();
        if let Some(slot) = self.current.slot
            && self.layout.is_collapsed(slot)
        {
            self.current.slot = self.layout.group_header_slot(group);
        }
        self.end_change(scope);
        self.refresh_visuals();
        true
    }

    /// Swap in a new layout, moving slot-indexed state through row indexes.
    fn relayout(&mut self, layout: SlotLayout) {
        let scope = self.begin_change();
        let old = std::mem::replace(&mut self.layout, layout);
        let rows = &self.rows;
        let new = &self.layout;
        let map = |slot: usize| {
            old.row_index_from_slot(slot)
                .and_then(|row| new.slot_from_row_index(row))
        };
        let item_at = |slot: usize| {
            old.row_index_from_slot(slot)
                .and_then(|row| rows.get(row).cloned())
        };
        self.selected_items.remap(map, item_at);
        self.current.slot = self
            .current
            .slot
            .and_then(map)
            .filter(|&s| !self.layout.is_collapsed(s));
        self.anchor_slot = self.anchor_slot.and_then(map);
        if let Some(estimator) = self.estimator.as_mut() {
            estimator.on_data_source_changed(self.layout.slot_count());
        }
        tracing::debug!(
            target: targets::SLOTS,
            slots = self.layout.slot_count(),
            groups = self.layout.group_count(),
            "layout replaced"
        );
        self.end_change(scope);
        self.refresh_visuals();
    }

    // =========================================================================
    // Columns
    // =========================================================================

    /// The grid's columns.
    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    /// Column at `index`.
    pub fn column_at(&self, index: usize) -> Result<&Column> {
        self.columns.at(index)
    }

    /// Append a column.
    pub fn add_column(&mut self, header: impl Into<String>) -> ColumnId {
        let id = self.columns.add(header);
        self.on_columns_changed();
        id
    }

    /// Append a filler column. Filler columns are never selectable.
    pub fn add_filler_column(&mut self) -> ColumnId {
        let id = self.columns.add_filler();
        self.on_columns_changed();
        id
    }

    /// Remove a column, dropping its selected cells.
    pub fn remove_column(&mut self, id: ColumnId) -> Result<()> {
        let index = self.columns.remove(id)?;
        let scope = self.begin_change();
        let selectable = self.columns.selectable_indexes();
        self.cells
            .remove_column(index, &selectable, self.rows.len());
        let shift = |column: usize| match column {
            c if c < index => Some(c),
            c if c == index => None,
            c => Some(c - 1),
        };
        self.current.column = self.current.column.and_then(shift);
        self.anchor_column = self.anchor_column.and_then(shift);
        self.end_change(scope);
        self.on_columns_changed();
        Ok(())
    }

    /// Show or hide a column.
    pub fn set_column_visible(&mut self, id: ColumnId, visible: bool) -> Result<()> {
        if self.columns.set_visible(id, visible)? {
            self.on_columns_changed();
        }
        Ok(())
    }

    /// Rename a column.
    pub fn set_column_header(&mut self, id: ColumnId, header: impl Into<String>) -> Result<()> {
        self.columns.set_header(id, header)
    }

    /// Recompute row headers and coerce currency after the selectable
    /// columns changed.
    fn on_columns_changed(&mut self) {
        let scope = self.begin_change();
        let selectable = self.columns.selectable_indexes();
        self.cells.refresh_row_headers(&selectable);
        if self.options.selection_unit.is_cell_based() {
            self.sync_rows_from_cells();
        }
        if self.current.slot.is_some() {
            self.current.column = self.coerce_column(self.current.column);
        }
        self.end_change(scope);
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    /// The selection mode in effect: single when either the grid or the
    /// attached model is single-select.
    fn effective_mode(&self) -> SelectionMode {
        if self.adapter.single_select() {
            SelectionMode::Single
        } else {
            self.options.selection_mode
        }
    }

    /// Selection-model index of the row at `slot`, whether or not its group
    /// is collapsed.
    fn model_index(&self, slot: usize) -> Option<usize> {
        self.layout
            .row_index_from_slot(slot)
            .map(|row| row + self.layout.selection_offset())
    }

    /// Returns `true` if `slot` can be targeted.
    fn is_valid_slot(&self, slot: usize) -> bool {
        isize::try_from(slot).is_ok_and(|s| !self.layout.is_slot_out_of_bounds(s))
    }

    /// Coerce a requested column, falling back to the current column and
    /// then to the first selectable one.
    fn coerce_column(&self, column: Option<usize>) -> Option<usize> {
        self.columns
            .coerce(column.or(self.current.column))
            .or_else(|| self.columns.first_selectable())
    }

    fn cell_at(&self, row: usize, column: usize) -> Option<CellInfo<T>> {
        let item = self.rows.get(row)?.clone();
        let id = self.columns.id_at(column)?;
        Some(CellInfo::resolved(item, id, row, column))
    }
}

impl<T: GridItem> std::fmt::Debug for DataGrid<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataGrid")
            .field("source", &self.source)
            .field("rows", &self.rows.len())
            .field("slots", &self.layout.slot_count())
            .field("options", &self.options)
            .field("selected", &self.selected_items.len())
            .field("cells", &self.cells.len())
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
