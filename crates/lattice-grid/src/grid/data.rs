//! The grid's data source.

use std::sync::Arc;

use crossbeam_channel::Sender;
use lattice_grid_core::logging::targets;
use lattice_grid_core::{CollectionChange, ConnectionGuard, Signal, SyncFlag};

use super::message::{GridMessage, forward};
use crate::model::{CollectionView, FlattenedChangedArgs, GridItem, HierarchicalModel, ItemSource};

fn view_collection_changed<T: GridItem>(view: &CollectionView<T>) -> &Signal<CollectionChange<T>> {
    &view.collection_changed
}

fn view_current_changed<T: GridItem>(view: &CollectionView<T>) -> &Signal<Option<usize>> {
    &view.current_changed
}

fn hierarchy_changed<T: GridItem>(model: &HierarchicalModel<T>) -> &Signal<FlattenedChangedArgs> {
    &model.flattened_changed
}

/// Rows the grid displays.
pub enum DataSource<T> {
    /// A flat, optionally filtered, sorted and paged view.
    View(Arc<CollectionView<T>>),
    /// A tree shown as its flattened visible rows.
    Hierarchy(Arc<HierarchicalModel<T>>),
}

impl<T: GridItem> DataSource<T> {
    /// The source as seen by the selection model.
    ///
    /// For a paged view this covers the whole view, not just the page.
    pub fn item_source(&self) -> Arc<dyn ItemSource<T>> {
        match self {
            Self::View(view) => view.clone(),
            Self::Hierarchy(model) => model.clone(),
        }
    }

    /// The rows currently displayed.
    pub fn rows(&self) -> Vec<T> {
        match self {
            Self::View(view) => view.page_items(),
            Self::Hierarchy(model) => model.flattened_items(),
        }
    }

    /// Selection index of the first displayed row.
    pub fn page_start(&self) -> usize {
        match self {
            Self::View(view) => view.page_start(),
            Self::Hierarchy(_) => 0,
        }
    }

    /// The collection view, if this is a flat source.
    pub fn collection_view(&self) -> Option<&Arc<CollectionView<T>>> {
        match self {
            Self::View(view) => Some(view),
            Self::Hierarchy(_) => None,
        }
    }

    /// The hierarchical model, if this is a tree source.
    pub fn hierarchy(&self) -> Option<&Arc<HierarchicalModel<T>>> {
        match self {
            Self::View(_) => None,
            Self::Hierarchy(model) => Some(model),
        }
    }

    /// Forward the source's change signals into the grid's inbox.
    ///
    /// Currency changes are dropped while `syncing_currency` is set, since
    /// those are the grid moving the view's currency itself.
    pub(crate) fn connect(
        &self,
        sender: &Sender<GridMessage<T>>,
        syncing_currency: &SyncFlag,
    ) -> Vec<ConnectionGuard> {
        match self {
            Self::View(view) => {
                let changes = sender.clone();
                let current = sender.clone();
                let syncing = syncing_currency.clone();
                vec![
                    Signal::connect_guarded(view, view_collection_changed::<T>, move |change| {
                        forward(&changes, GridMessage::SourceChanged(change.clone()));
                    }),
                    Signal::connect_guarded(view, view_current_changed::<T>, move |position| {
                        if syncing.is_set() {
                            tracing::trace!(target: targets::DATA, "currency echo dropped");
                            return;
                        }
                        forward(&current, GridMessage::CurrentChanged(*position));
                    }),
                ]
            }
            Self::Hierarchy(model) => {
                let sender = sender.clone();
                vec![Signal::connect_guarded(model, hierarchy_changed::<T>, move |args| {
                    forward(&sender, GridMessage::HierarchyChanged(args.clone()));
                })]
            }
        }
    }
}

impl<T> Clone for DataSource<T> {
    fn clone(&self) -> Self {
        match self {
            Self::View(view) => Self::View(Arc::clone(view)),
            Self::Hierarchy(model) => Self::Hierarchy(Arc::clone(model)),
        }
    }
}

impl<T> std::fmt::Debug for DataSource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::View(_) => f.write_str("DataSource::View"),
            Self::Hierarchy(_) => f.write_str("DataSource::Hierarchy"),
        }
    }
}

impl<T> From<Arc<CollectionView<T>>> for DataSource<T> {
    fn from(view: Arc<CollectionView<T>>) -> Self {
        Self::View(view)
    }
}

impl<T> From<Arc<HierarchicalModel<T>>> for DataSource<T> {
    fn from(model: Arc<HierarchicalModel<T>>) -> Self {
        Self::Hierarchy(model)
    }
}
