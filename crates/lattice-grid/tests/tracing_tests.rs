//! Instrumentation tests: the hot entry points open their spans and
//! refused transitions are reported.

use std::sync::Arc;

use lattice_grid::grid::{DataGrid, DataSource, EditingHost, SelectionGesture};
use lattice_grid::model::{CollectionView, HierarchicalModel};
use lattice_grid_core::logging::{span_names, targets};
use parking_lot::Mutex;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::{EnvFilter, Layer};

// ============================================================================
// Test Infrastructure
// ============================================================================

/// Records span names and event levels and targets.
#[derive(Clone, Default)]
struct Capture {
    spans: Arc<Mutex<Vec<String>>>,
    events: Arc<Mutex<Vec<(tracing::Level, String)>>>,
}

impl<S: tracing::Subscriber> Layer<S> for Capture {
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: Context<'_, S>,
    ) {
        self.spans.lock().push(attrs.metadata().name().to_string());
    }

    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        self.events
            .lock()
            .push((*metadata.level(), metadata.target().to_string()));
    }
}

impl Capture {
    fn has_span(&self, name: &str) -> bool {
        self.spans.lock().iter().any(|s| s == name)
    }

    fn count(&self, level: tracing::Level, target: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|(l, t)| *l == level && t == target)
            .count()
    }
}

fn with_capture<F: FnOnce()>(f: F) -> Capture {
    let capture = Capture::default();
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::new("lattice_grid=debug"))
        .with(capture.clone());
    tracing::subscriber::with_default(subscriber, f);
    capture
}

fn grid(n: usize) -> (DataGrid<usize>, Arc<CollectionView<usize>>) {
    let view = Arc::new(CollectionView::new((0..n).collect()));
    let mut grid = DataGrid::new().with_data_source(DataSource::from(Arc::clone(&view)));
    grid.add_column("Value");
    (grid, view)
}

struct RefusingEditor;

impl EditingHost for RefusingEditor {
    fn is_editing(&self) -> bool {
        true
    }

    fn commit_edit(&mut self) -> bool {
        false
    }
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn selection_opens_process_span() {
    let capture = with_capture(|| {
        let (mut grid, _) = grid(5);
        grid.click_cell(2, None, SelectionGesture::plain());
    });
    assert!(capture.has_span(span_names::PROCESS_SELECTION));
}

#[test]
fn model_pull_opens_apply_span() {
    let capture = with_capture(|| {
        let (mut grid, _) = grid(5);
        grid.selection_model().select(1);
        grid.dispatch_pending();
        assert_eq!(grid.selected_items(), vec![1]);
    });
    assert!(capture.has_span(span_names::APPLY_SELECTION_MODEL));
}

#[test]
fn hierarchy_change_opens_span() {
    let capture = with_capture(|| {
        let model = Arc::new(HierarchicalModel::new());
        let root = model.add_root("root".to_string());
        model.add_child(root, "child".to_string());
        let mut grid = DataGrid::new().with_data_source(DataSource::from(Arc::clone(&model)));
        model.expand(root);
        grid.dispatch_pending();
        assert_eq!(grid.row_count(), 2);
    });
    assert!(capture.has_span(span_names::HIERARCHY_CHANGE));
}

#[test]
fn refused_commit_is_warned() {
    let capture = with_capture(|| {
        let (grid, _) = grid(5);
        let mut grid = grid.with_editing_host(Box::new(RefusingEditor));
        assert!(!grid.click_cell(2, None, SelectionGesture::plain()));
    });
    assert_eq!(capture.count(tracing::Level::WARN, targets::SELECTION), 1);
}
