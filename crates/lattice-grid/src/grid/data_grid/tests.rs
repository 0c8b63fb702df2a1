use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use lattice_grid_core::Signal;
use parking_lot::Mutex;

use super::*;
use crate::grid::selection::{Navigation, SelectionAction, SelectionGesture, SelectionRequest};
use crate::model::{CollectionView, IndexSelectionModel, ItemSource, SelectionModel};

/// A grid over `0..n` with two columns, "A" and "B".
fn grid(n: usize) -> (DataGrid<usize>, Arc<CollectionView<usize>>) {
    let view = Arc::new(CollectionView::new((0..n).collect()));
    let mut grid = DataGrid::new().with_data_source(DataSource::from(Arc::clone(&view)));
    grid.add_column("A");
    grid.add_column("B");
    (grid, view)
}

fn record<A: Clone + Send + Sync + 'static>(signal: &Signal<A>) -> Arc<Mutex<Vec<A>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    signal.connect(move |args: &A| sink.lock().push(args.clone()));
    log
}

/// An editor whose commits succeed only when `accept` is set.
struct Editor {
    editing: Arc<AtomicBool>,
    accept: bool,
    commits: Arc<AtomicUsize>,
}

impl EditingHost for Editor {
    fn is_editing(&self) -> bool {
        self.editing.load(Ordering::SeqCst)
    }

    fn commit_edit(&mut self) -> bool {
        self.commits.fetch_add(1, Ordering::SeqCst);
        if self.accept {
            self.editing.store(false, Ordering::SeqCst);
        }
        self.accept
    }
}

struct RefusingScroller;

impl ScrollHost for RefusingScroller {
    fn scroll_into_view(&mut self, _slot: usize, _column: Option<usize>) -> bool {
        false
    }
}

fn plain() -> SelectionGesture {
    SelectionGesture::plain()
}

// =========================================================================
// Pointer gestures
// =========================================================================

#[test]
fn test_single_mode_click_replaces_selection() {
    let (grid, _) = grid(5);
    let mut grid = grid.with_selection_mode(SelectionMode::Single);
    let events = record(&grid.selection_changed);

    assert!(grid.click_cell(1, Some(0), plain()));
    assert!(grid.click_cell(3, Some(0), plain()));

    assert_eq!(grid.selected_items(), vec![3]);
    assert_eq!(grid.selection_model().selected_indexes(), vec![3]);
    let events = events.lock();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].added_items, vec![3]);
    assert_eq!(events[1].removed_items, vec![1]);
}

#[test]
fn test_shift_click_extends_from_fixed_anchor() {
    let (mut grid, _) = grid(8);
    assert!(grid.click_cell(2, None, plain()));
    assert!(grid.click_cell(5, None, SelectionGesture::shift()));
    assert_eq!(grid.selected_items(), vec![2, 3, 4, 5]);
    assert_eq!(grid.anchor_slot(), Some(2));

    assert!(grid.click_cell(0, None, SelectionGesture::shift()));
    assert_eq!(grid.selected_items(), vec![0, 1, 2]);
    assert_eq!(grid.anchor_slot(), Some(2));
    assert_eq!(grid.selection_model().selected_indexes(), vec![0, 1, 2]);
    assert_eq!(grid.current_cell().slot, Some(0));
}

#[test]
fn test_ctrl_click_toggles() {
    let (mut grid, _) = grid(5);
    assert!(grid.click_cell(1, None, plain()));
    assert!(grid.click_cell(3, None, SelectionGesture::ctrl()));
    assert_eq!(grid.selected_items(), vec![1, 3]);

    assert!(grid.click_cell(1, None, SelectionGesture::ctrl()));
    assert_eq!(grid.selected_items(), vec![3]);
    assert_eq!(grid.anchor_slot(), Some(3));
    assert_eq!(grid.selection_model().selected_indexes(), vec![3]);
}

#[test]
fn test_out_of_bounds_targets_are_rejected() {
    let (mut grid, _) = grid(3);
    let events = record(&grid.selection_changed);
    assert!(!grid.click_cell(-2, None, plain()));
    assert!(!grid.click_cell(-1, None, plain()));
    assert!(!grid.click_cell(3, None, plain()));
    assert!(events.lock().is_empty());
    assert_eq!(grid.current_cell(), CellCoordinate::none());
}

#[test]
fn test_collapsed_slot_is_rejected() {
    let (mut grid, _) = grid(4);
    grid.set_row_groups(&[GroupSpec::new(2), GroupSpec::new(2)]).unwrap();
    // slots: h0 r0 r1 h1 r2 r3
    assert!(grid.set_group_collapsed(0, true));
    assert!(grid.is_slot_out_of_bounds(1));
    assert!(!grid.click_cell(1, None, plain()));
    assert!(grid.click_cell(4, None, plain()));
    assert_eq!(grid.selected_items(), vec![2]);
}

#[test]
fn test_group_slot_takes_currency_only() {
    let (mut grid, _) = grid(4);
    grid.set_row_groups(&[GroupSpec::new(2), GroupSpec::new(2)]).unwrap();
    assert!(grid.click_cell(1, None, plain()));
    assert_eq!(grid.selected_items(), vec![0]);

    let request = SelectionRequest::group(1, SelectionAction::SelectCurrent);
    assert!(grid.process_selection_and_currency(request));
    assert_eq!(grid.current_cell().slot, Some(3));
    assert_eq!(grid.selected_items(), vec![0]);
}

#[test]
fn test_item_request_falls_back_to_backup_slot() {
    let (mut grid, _) = grid(5);
    let request = SelectionRequest::item(3, SelectionAction::SelectCurrent);
    assert!(grid.process_selection_and_currency(request));
    assert_eq!(grid.selected_items(), vec![3]);

    let request = SelectionRequest::item(99, SelectionAction::SelectCurrent).with_backup_slot(1);
    assert!(grid.process_selection_and_currency(request));
    assert_eq!(grid.selected_items(), vec![1]);
}

#[test]
fn test_compound_operation_emits_net_delta_once() {
    let (mut grid, _) = grid(5);
    let events = record(&grid.selection_changed);
    let currency = record(&grid.current_cell_changed);

    let scope = grid.begin_change();
    assert!(grid.click_cell(1, None, plain()));
    assert!(grid.click_cell(2, None, SelectionGesture::ctrl()));
    assert!(grid.click_cell(1, None, SelectionGesture::ctrl()));
    assert!(grid.is_changing());
    assert!(events.lock().is_empty());
    grid.end_change(scope);

    let events = events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].added_items, vec![2]);
    assert!(events[0].removed_items.is_empty());
    assert_eq!(currency.lock().len(), 1);
}

// =========================================================================
// Hosts
// =========================================================================

#[test]
fn test_failed_commit_changes_nothing() {
    let editing = Arc::new(AtomicBool::new(false));
    let commits = Arc::new(AtomicUsize::new(0));
    let (grid, _) = grid(5);
    let mut grid = grid.with_editing_host(Box::new(Editor {
        editing: Arc::clone(&editing),
        accept: false,
        commits: Arc::clone(&commits),
    }));
    let events = record(&grid.selection_changed);

    assert!(grid.click_cell(1, Some(0), plain()));
    editing.store(true, Ordering::SeqCst);
    assert!(!grid.click_cell(3, Some(0), plain()));

    assert_eq!(commits.load(Ordering::SeqCst), 1);
    assert_eq!(grid.selected_items(), vec![1]);
    assert_eq!(grid.current_cell(), CellCoordinate::new(Some(0), Some(1)));
    assert_eq!(grid.selection_model().selected_indexes(), vec![1]);
    assert_eq!(events.lock().len(), 1);

    // Re-targeting the current cell needs no commit.
    assert!(grid.click_cell(1, Some(0), plain()));
    assert_eq!(commits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_successful_commit_lets_selection_move() {
    let editing = Arc::new(AtomicBool::new(true));
    let commits = Arc::new(AtomicUsize::new(0));
    let (grid, _) = grid(5);
    let mut grid = grid.with_editing_host(Box::new(Editor {
        editing: Arc::clone(&editing),
        accept: true,
        commits: Arc::clone(&commits),
    }));

    assert!(grid.click_cell(2, None, plain()));
    assert_eq!(commits.load(Ordering::SeqCst), 1);
    assert!(!editing.load(Ordering::SeqCst));
    assert_eq!(grid.selected_items(), vec![2]);
}

#[test]
fn test_scroll_refusal_blocks_keyboard_move() {
    let (grid, _) = grid(5);
    let mut grid = grid.with_scroll_host(Box::new(RefusingScroller));
    // Pointer presses do not ask to scroll.
    assert!(grid.click_cell(1, None, plain()));
    assert!(!grid.move_current(Navigation::Down, plain()));
    assert_eq!(grid.selected_items(), vec![1]);
    assert_eq!(grid.current_cell().slot, Some(1));
}

// =========================================================================
// Keyboard
// =========================================================================

#[test]
fn test_shift_arrow_extends_selection() {
    let (mut grid, _) = grid(6);
    assert!(grid.click_cell(2, None, plain()));
    assert!(grid.move_current(Navigation::Down, SelectionGesture::shift()));
    assert_eq!(grid.selected_items(), vec![2, 3]);
    assert!(grid.move_current(Navigation::Down, SelectionGesture::shift()));
    assert_eq!(grid.selected_items(), vec![2, 3, 4]);

    assert!(grid.move_current(Navigation::Up, plain()));
    assert_eq!(grid.selected_items(), vec![3]);
    assert_eq!(grid.anchor_slot(), Some(3));
}

#[test]
fn test_ctrl_arrow_moves_currency_only() {
    let (mut grid, _) = grid(6);
    assert!(grid.click_cell(2, None, plain()));
    assert!(grid.move_current(Navigation::End, SelectionGesture::ctrl()));
    assert_eq!(grid.current_cell().slot, Some(5));
    assert_eq!(grid.selected_items(), vec![2]);
    assert!(!grid.move_current(Navigation::Down, plain()));
}

// =========================================================================
// Primary selection
// =========================================================================

#[test]
fn test_set_selected_index_rolls_back_on_refusal() {
    let editing = Arc::new(AtomicBool::new(false));
    let (grid, _) = grid(5);
    let mut grid = grid.with_editing_host(Box::new(Editor {
        editing: Arc::clone(&editing),
        accept: false,
        commits: Arc::new(AtomicUsize::new(0)),
    }));
    let changes = record(&grid.selected_index_changed);

    assert!(grid.set_selected_index(Some(1)));
    assert_eq!(grid.selected_index(), Some(1));
    assert_eq!(grid.selected_item(), Some(1));

    editing.store(true, Ordering::SeqCst);
    assert!(!grid.set_selected_index(Some(3)));
    assert_eq!(grid.selected_index(), Some(1));
    assert!(!grid.set_selected_index(Some(10)));

    assert_eq!(*changes.lock(), vec![Some(1)]);
}

#[test]
fn test_set_selected_item() {
    let (mut grid, _) = grid(5);
    assert!(grid.set_selected_item(Some(4)));
    assert_eq!(grid.selected_items(), vec![4]);
    assert_eq!(grid.current_item(), Some(4));
    assert!(!grid.set_selected_item(Some(42)));

    assert!(grid.set_selected_item(None));
    assert!(grid.selected_items().is_empty());
    assert_eq!(grid.selected_index(), None);
    // Currency stays.
    assert_eq!(grid.current_cell().slot, Some(4));
}

#[test]
fn test_select_all_emits_once() {
    let (mut grid, _) = grid(10);
    let events = record(&grid.selection_changed);
    grid.select_all();
    assert_eq!(grid.selected_count(), 10);
    assert_eq!(grid.selection_model().selected_indexes().len(), 10);
    let events = events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].added_items.len(), 10);
}

#[test]
fn test_selection_mode_change_clears() {
    let (mut grid, _) = grid(5);
    let events = record(&grid.selection_changed);
    assert!(grid.click_cell(1, None, plain()));
    grid.set_selection_mode(SelectionMode::Single);

    assert!(grid.selected_items().is_empty());
    assert!(grid.selection_model().single_select());
    assert_eq!(events.lock().len(), 2);

    grid.select_all();
    assert!(grid.selected_items().is_empty());
}

// =========================================================================
// Currency
// =========================================================================

#[test]
fn test_current_column_changes() {
    let (mut grid, _) = grid(3);
    assert_eq!(
        grid.set_current_column(5),
        Err(GridError::ColumnOutOfRange { index: 5, count: 2 })
    );
    assert_eq!(grid.set_current_column(1), Ok(false));

    assert!(grid.click_cell(1, Some(0), plain()));
    assert_eq!(grid.set_current_column(1), Ok(true));
    assert_eq!(grid.current_cell(), CellCoordinate::new(Some(1), Some(1)));
    assert_eq!(grid.selected_items(), vec![1]);
}

#[test]
fn test_removing_column_shifts_current_column() {
    let (mut grid, _) = grid(3);
    let a = grid.columns().id_at(0).unwrap();
    assert!(grid.click_cell(1, Some(1), plain()));
    grid.remove_column(a).unwrap();

    assert_eq!(grid.columns().len(), 1);
    assert_eq!(grid.current_cell(), CellCoordinate::new(Some(0), Some(1)));
    assert!(grid.remove_column(a).is_err());
}

// =========================================================================
// Selection model
// =========================================================================

#[test]
fn test_swapping_selection_model_pulls_its_selection() {
    let (mut grid, view) = grid(5);
    assert!(grid.click_cell(1, None, plain()));

    let source: Arc<dyn ItemSource<usize>> = view;
    let model: Arc<dyn SelectionModel<usize>> =
        Arc::new(IndexSelectionModel::with_source(source, false));
    model.select(3);
    grid.set_selection_model(Some(Arc::clone(&model))).unwrap();

    assert!(model.is_attached());
    assert_eq!(grid.selected_items(), vec![3]);
    assert_eq!(grid.current_cell().slot, Some(3));

    let mut other: DataGrid<usize> = DataGrid::new();
    assert_eq!(
        other.set_selection_model(Some(Arc::clone(&model))),
        Err(GridError::SelectionModelAttached)
    );

    grid.set_selection_model(None).unwrap();
    assert!(!model.is_attached());
    assert!(grid.selected_items().is_empty());
}

#[test]
fn test_setting_same_model_is_noop() {
    let (mut grid, _) = grid(5);
    assert!(grid.click_cell(2, None, plain()));
    let model = Arc::clone(grid.selection_model());
    grid.set_selection_model(Some(model)).unwrap();
    assert_eq!(grid.selected_items(), vec![2]);
}

// =========================================================================
// Source changes
// =========================================================================

#[test]
fn test_insert_shifts_selection_and_currency() {
    let (mut grid, view) = grid(5);
    let events = record(&grid.selection_changed);
    assert!(grid.click_cell(2, None, plain()));

    view.insert(0, 99);
    grid.dispatch_pending();

    assert_eq!(grid.selected_items(), vec![2]);
    assert_eq!(grid.selected_slots(), vec![3]);
    assert_eq!(grid.selection_model().selected_indexes(), vec![3]);
    assert_eq!(grid.current_cell().slot, Some(3));
    assert_eq!(events.lock().len(), 1);
}

#[test]
fn test_removing_current_row_moves_to_nearest() {
    let (mut grid, view) = grid(5);
    let events = record(&grid.selection_changed);
    assert!(grid.click_cell(2, None, plain()));

    assert!(view.remove(&2));
    grid.dispatch_pending();

    assert!(grid.selected_items().is_empty());
    assert!(grid.selection_model().selected_indexes().is_empty());
    assert_eq!(grid.current_cell().slot, Some(2));
    assert_eq!(grid.current_item(), Some(3));
    assert_eq!(view.current_position(), Some(2));
    assert_eq!(grid.anchor_slot(), None);

    let events = events.lock();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].removed_items, vec![2]);
}

#[test]
fn test_reset_restores_by_identity() {
    let (mut grid, view) = grid(5);
    assert!(grid.click_cell(1, None, plain()));
    assert!(grid.click_cell(3, None, SelectionGesture::ctrl()));
    let events = record(&grid.selection_changed);

    view.reset(vec![3, 9, 1, 7]);
    grid.dispatch_pending();

    assert_eq!(grid.selected_items(), vec![3, 1]);
    assert_eq!(grid.selected_slots(), vec![0, 2]);
    assert_eq!(grid.selection_model().selected_indexes(), vec![0, 2]);
    assert_eq!(grid.selected_item(), Some(1));
    assert_eq!(grid.current_item(), Some(3));
    assert_eq!(grid.anchor_slot(), Some(0));
    assert_eq!(view.current_position(), Some(0));
    assert!(events.lock().is_empty());
}

#[test]
fn test_reset_dropping_current_clears_currency() {
    let (mut grid, view) = grid(5);
    assert!(grid.click_cell(4, Some(1), plain()));
    view.reset(vec![0, 1]);
    grid.dispatch_pending();

    assert!(grid.selected_items().is_empty());
    assert_eq!(grid.current_cell(), CellCoordinate::none());
}

#[test]
fn test_selection_returns_with_its_page() {
    let view = Arc::new(CollectionView::new((0..30).collect::<Vec<usize>>()).with_page_size(10));
    let mut grid = DataGrid::new().with_data_source(DataSource::from(Arc::clone(&view)));
    grid.add_column("A");
    assert!(grid.click_cell(2, None, plain()));

    assert!(view.move_to_page(1));
    grid.dispatch_pending();
    assert!(grid.selected_slots().is_empty());
    assert_eq!(grid.selection_model().selected_indexes(), vec![2]);

    assert!(view.move_to_page(0));
    grid.dispatch_pending();
    assert_eq!(grid.selected_slots(), vec![2]);
    assert_eq!(grid.selected_items(), vec![2]);
    assert_eq!(grid.selection_model().selected_indexes(), vec![2]);
}

#[test]
fn test_selection_off_page_follows_sort() {
    let view = Arc::new(CollectionView::new((0..20).collect::<Vec<usize>>()).with_page_size(5));
    let mut grid = DataGrid::new().with_data_source(DataSource::from(Arc::clone(&view)));
    grid.add_column("A");
    assert!(grid.click_cell(1, None, plain()));
    assert!(grid.click_cell(3, None, SelectionGesture::ctrl()));

    // Descending order moves items 1 and 3 to the last page.
    view.set_sort(Some(Arc::new(|a: &usize, b: &usize| b.cmp(a))));
    grid.dispatch_pending();
    assert!(grid.selected_slots().is_empty());

    assert!(view.move_to_page(3));
    grid.dispatch_pending();
    assert_eq!(grid.rows(), &[4, 3, 2, 1, 0]);
    assert_eq!(grid.selected_slots(), vec![1, 3]);
    assert_eq!(grid.selection_model().selected_indexes(), vec![16, 18]);
}

#[test]
fn test_move_keeps_selection_on_item() {
    let (mut grid, view) = grid(5);
    assert!(grid.click_cell(1, None, plain()));

    assert!(view.move_item(1, 4));
    grid.dispatch_pending();

    assert_eq!(grid.rows(), &[0, 2, 3, 4, 1]);
    assert_eq!(grid.selected_items(), vec![1]);
    assert_eq!(grid.selected_slots(), vec![4]);
    assert_eq!(grid.selection_model().selected_indexes(), vec![4]);
    assert_eq!(grid.current_cell().slot, Some(4));
}

#[test]
fn test_replacing_data_source_clears_selection() {
    let (mut grid, _) = grid(5);
    assert!(grid.click_cell(1, None, plain()));

    let next = Arc::new(CollectionView::new(vec![10, 11]));
    next.move_current_to_position(Some(1));
    grid.set_data_source(Some(DataSource::from(next)));

    assert_eq!(grid.row_count(), 2);
    assert!(grid.selected_items().is_empty());
    assert_eq!(grid.current_item(), Some(11));
}

// =========================================================================
// Cell units
// =========================================================================

#[test]
fn test_row_header_selects_every_cell_in_row() {
    let (grid, _) = grid(5);
    let mut grid = grid.with_selection_unit(SelectionUnit::CellOrRowHeader);
    let cell_events = record(&grid.selected_cells_changed);

    assert!(grid.select_row_header(2, plain()));
    assert_eq!(grid.selected_cells().len(), 2);
    assert!(grid.is_row_header_selected(2));
    assert_eq!(grid.selected_items(), vec![2]);
    assert_eq!(grid.selection_model().selected_indexes(), vec![2]);

    assert!(grid.click_cell(2, Some(0), SelectionGesture::ctrl()));
    assert_eq!(grid.selected_cells().len(), 1);
    assert!(!grid.is_row_header_selected(2));
    assert!(grid.selected_items().is_empty());
    assert!(grid.selection_model().selected_indexes().is_empty());
    assert_eq!(cell_events.lock().len(), 2);
}

#[test]
fn test_row_header_ignored_in_full_row_unit() {
    let (mut grid, _) = grid(5);
    assert!(!grid.select_row_header(2, plain()));
}

#[test]
fn test_cell_click_selects_single_cell() {
    let (grid, _) = grid(5);
    let mut grid = grid.with_selection_unit(SelectionUnit::CellOrRowOrColumnHeader);
    assert!(grid.click_cell(1, Some(1), plain()));
    assert!(grid.is_cell_selected(1, 1));
    assert!(!grid.is_cell_selected(1, 0));
    assert!(grid.selected_items().is_empty());

    assert!(grid.click_cell(3, Some(0), SelectionGesture::shift()));
    assert_eq!(grid.selected_cells().len(), 6);
    assert_eq!(grid.selected_items(), vec![1, 2, 3]);
}

#[test]
fn test_column_header_selects_whole_column() {
    let (grid, _) = grid(5);
    let mut grid = grid.with_selection_unit(SelectionUnit::CellOrColumnHeader);
    let b = grid.columns().id_at(1).unwrap();
    let column_events = record(&grid.selected_columns_changed);

    assert!(grid.select_column_header(1, plain()));
    assert!(grid.is_column_selected(b));
    assert_eq!(grid.selected_columns(), vec![b]);
    assert_eq!(grid.selected_cells().len(), 5);
    assert!(grid.selected_items().is_empty());

    let column_events = column_events.lock();
    assert_eq!(column_events.len(), 1);
    assert_eq!(column_events[0].added_columns, vec![b]);
}

#[test]
fn test_column_header_rejected_in_single_mode() {
    let (grid, _) = grid(5);
    let mut grid = grid
        .with_selection_unit(SelectionUnit::CellOrColumnHeader)
        .with_selection_mode(SelectionMode::Single);
    assert!(!grid.select_column_header(0, plain()));
    assert!(grid.selected_cells().is_empty());
}

#[test]
fn test_hiding_column_completes_row_headers() {
    let (grid, _) = grid(3);
    let mut grid = grid.with_selection_unit(SelectionUnit::CellOrRowHeader);
    let b = grid.columns().id_at(1).unwrap();
    assert!(grid.click_cell(0, Some(0), plain()));
    assert!(grid.selected_items().is_empty());

    grid.set_column_visible(b, false).unwrap();
    assert!(grid.is_row_header_selected(0));
    assert_eq!(grid.selected_items(), vec![0]);
}
