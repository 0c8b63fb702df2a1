//! End-to-end selection scenarios driven through the public API.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lattice_grid::grid::{
    DataGrid, DataSource, SelectionAction, SelectionGesture, SelectionMode, SelectionRequest,
    SelectionUnit,
};
use lattice_grid::model::{CollectionView, HierarchicalModel};
use lattice_grid_core::ObservableList;
use parking_lot::Mutex;

fn rows(n: usize) -> (DataGrid<usize>, Arc<CollectionView<usize>>) {
    let view = Arc::new(CollectionView::new((0..n).collect()));
    let mut grid = DataGrid::new().with_data_source(DataSource::from(Arc::clone(&view)));
    grid.add_column("Value");
    (grid, view)
}

// ============================================================================
// Single selection
// ============================================================================

#[test]
fn single_selection_replaces_previous_row() {
    let (grid, _) = rows(100);
    let mut grid = grid.with_selection_mode(SelectionMode::Single);
    assert!(grid.set_selected_index(Some(5)));

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    grid.selection_changed.connect(move |args| sink.lock().push(args.clone()));

    assert!(grid.set_selected_index(Some(10)));

    assert_eq!(grid.selected_index(), Some(10));
    assert_eq!(grid.selected_count(), 1);
    assert!(!grid.is_slot_selected(5));
    let events = events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].removed_items, vec![5]);
    assert_eq!(events[0].added_items, vec![10]);
}

// ============================================================================
// Range selection
// ============================================================================

#[test]
fn range_selection_from_anchor() {
    let (mut grid, _) = rows(20);
    assert!(grid.set_selected_index(Some(2)));
    assert_eq!(grid.anchor_slot(), Some(2));

    let request = SelectionRequest::slot(7, SelectionAction::SelectFromAnchorToCurrent);
    assert!(grid.process_selection_and_currency(request));

    assert_eq!(grid.selected_items(), (2..=7).collect::<Vec<_>>());
    assert_eq!(grid.selected_count(), 6);
    assert_eq!(grid.anchor_slot(), Some(2));
    assert_eq!(
        grid.selection_model().selected_indexes(),
        (2..=7).collect::<Vec<_>>()
    );
}

#[test]
fn range_without_anchor_selects_target_only() {
    let (mut grid, _) = rows(20);
    let request = SelectionRequest::slot(7, SelectionAction::SelectFromAnchorToCurrent);
    assert!(grid.process_selection_and_currency(request));
    assert_eq!(grid.selected_items(), vec![7]);
    assert_eq!(grid.anchor_slot(), Some(7));
}

// ============================================================================
// Hierarchy collapse
// ============================================================================

#[test]
fn hierarchy_collapse_keeps_top_row_in_place() {
    let model = Arc::new(HierarchicalModel::new());
    let root = model.add_root("root".to_string());
    for i in 0..10 {
        model.add_child(root, format!("child{i}"));
    }
    for i in 0..60 {
        model.add_root(format!("tail{i}"));
    }
    model.expand(root);

    let mut grid = DataGrid::new().with_data_source(DataSource::from(Arc::clone(&model)));
    let h = grid.options().row_height_estimate;
    grid.set_viewport(50.0 * h, 10.0 * h);
    let top_item = grid.item_at_slot(50);
    assert_eq!(grid.displayed_slots().start, 50);

    model.collapse(root);
    grid.dispatch_pending();
    assert_eq!(grid.arrange(), Some(40.0 * h));

    let top = grid.displayed_slots().start;
    assert_eq!(top, 40);
    assert_eq!(grid.item_at_slot(top), top_item);
    let pixel_offset = grid.estimate_offset(top) - grid.viewport().offset();
    assert!(pixel_offset.abs() < 0.5);
}

// ============================================================================
// Column promotion
// ============================================================================

#[test]
fn column_selected_only_when_every_cell_is() {
    let view = Arc::new(CollectionView::new((0..5).collect::<Vec<usize>>()));
    let mut grid = DataGrid::new()
        .with_data_source(DataSource::from(view))
        .with_selection_unit(SelectionUnit::CellOrColumnHeader);
    grid.add_column("A");
    grid.add_column("B");
    let c = grid.add_column("C");

    for row in 0..5 {
        assert!(!grid.is_column_selected(c));
        assert!(grid.click_cell(row, Some(2), SelectionGesture::ctrl()));
    }
    assert!(grid.is_column_selected(c));
    assert_eq!(grid.selected_columns(), vec![c]);

    assert!(grid.click_cell(3, Some(2), SelectionGesture::ctrl()));
    assert!(!grid.is_column_selected(c));
    assert!(grid.selected_columns().is_empty());
}

// ============================================================================
// Bound lists
// ============================================================================

#[test]
fn bound_list_removal_deselects_without_echo() {
    let (mut grid, _) = rows(10);
    let list = Arc::new(ObservableList::new());
    grid.bind_selected_items(Arc::clone(&list));
    grid.select_all();
    assert_eq!(list.len(), 10);

    let list_writes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&list_writes);
    list.collection_changed.connect(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert!(list.remove(&4));
    grid.dispatch_pending();

    assert!(!grid.is_slot_selected(4));
    assert_eq!(grid.selected_count(), 9);
    assert!(!grid.selection_model().is_selected(4));
    // Only the host's own removal touched the list.
    assert_eq!(list_writes.load(Ordering::SeqCst), 1);
    assert!(!grid.has_pending());
}

#[test]
fn bound_list_follows_pointer_selection() {
    let (mut grid, _) = rows(10);
    let list = Arc::new(ObservableList::new());
    grid.bind_selected_items(Arc::clone(&list));

    assert!(grid.click_cell(2, None, SelectionGesture::plain()));
    assert!(grid.click_cell(4, None, SelectionGesture::shift()));
    let mut listed = list.to_vec();
    listed.sort_unstable();
    assert_eq!(listed, vec![2, 3, 4]);

    let unbound = grid.unbind_selected_items();
    assert!(unbound.is_some());
    grid.clear_selection();
    assert_eq!(list.len(), 3);
}

// ============================================================================
// Paging
// ============================================================================

#[test]
fn paged_view_maps_rows_to_model_indexes() {
    let view = Arc::new(CollectionView::new((0..30).collect::<Vec<usize>>()).with_page_size(10));
    let mut grid = DataGrid::new().with_data_source(DataSource::from(Arc::clone(&view)));
    grid.add_column("Value");

    assert!(view.move_to_page(1));
    grid.dispatch_pending();
    assert_eq!(grid.row_count(), 10);
    assert_eq!(grid.rows()[0], 10);

    assert!(grid.click_cell(3, None, SelectionGesture::plain()));
    assert_eq!(grid.selected_items(), vec![13]);
    assert_eq!(grid.selection_model().selected_indexes(), vec![13]);
}
