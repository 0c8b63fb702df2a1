//! Two-way bindings between the grid's selection and external lists.
//!
//! A bound list is an [`ObservableList`] the host owns. Edits the host makes
//! to it are forwarded into the grid's inbox; the grid writes its own
//! changes back at flush time. Writes from the grid happen under the
//! binding's [`SyncFlag`], so the list's change signal is not forwarded
//! back, and only entries the list disagrees on are touched.

use std::sync::Arc;

use crossbeam_channel::Sender;
use lattice_grid_core::logging::targets;
use lattice_grid_core::{CollectionChange, ConnectionGuard, ObservableList, Signal, SyncFlag};

use super::cells::CellInfo;
use super::columns::ColumnId;
use super::message::{GridMessage, forward};

fn list_changed<V: Clone + PartialEq + Send + Sync + 'static>(
    list: &ObservableList<V>,
) -> &Signal<CollectionChange<V>> {
    &list.collection_changed
}

/// One external list bound to the grid.
pub struct BoundList<V> {
    list: Arc<ObservableList<V>>,
    syncing: SyncFlag,
    _connection: ConnectionGuard,
}

impl<V: Clone + PartialEq + Send + Sync + 'static> BoundList<V> {
    /// Bind `list`, wrapping its changes with `wrap` into grid messages.
    pub fn bind<T: Send + 'static>(
        list: Arc<ObservableList<V>>,
        name: &'static str,
        sender: Sender<GridMessage<T>>,
        wrap: fn(CollectionChange<V>) -> GridMessage<T>,
    ) -> Self {
        let syncing = SyncFlag::new(name);
        let flag = syncing.clone();
        let connection = Signal::connect_guarded(&list, list_changed::<V>, move |change| {
            if flag.is_set() {
                return;
            }
            forward(&sender, wrap(change.clone()));
        });
        tracing::debug!(target: targets::BINDING, binding = name, "list bound");
        Self {
            list,
            syncing,
            _connection: connection,
        }
    }

    /// The bound list.
    pub fn list(&self) -> &Arc<ObservableList<V>> {
        &self.list
    }

    /// Write a delta to the list, skipping entries it already agrees with.
    ///
    /// Returns the number of list writes.
    pub fn push_delta(&self, added: &[V], removed: &[V]) -> usize {
        let _guard = self.syncing.enter();
        let mut writes = 0;
        for value in removed {
            if !added.contains(value) && self.list.remove(value) {
                writes += 1;
            }
        }
        for value in added {
            if !self.list.contains(value) {
                self.list.push(value.clone());
                writes += 1;
            }
        }
        if writes > 0 {
            tracing::trace!(
                target: targets::BINDING,
                binding = self.syncing.name(),
                writes,
                "list updated"
            );
        }
        writes
    }

    /// Make the list hold exactly `values`. Returns `true` if it was written.
    pub fn reset_to(&self, values: Vec<V>) -> bool {
        if self.list.to_vec() == values {
            return false;
        }
        let _guard = self.syncing.enter();
        self.list.reset(values);
        true
    }
}

impl<V> std::fmt::Debug for BoundList<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundList")
            .field("syncing", &self.syncing)
            .finish_non_exhaustive()
    }
}

/// The grid's optional bindings.
pub struct Bindings<T> {
    /// Bound selected items.
    pub items: Option<BoundList<T>>,
    /// Bound selected cells.
    pub cells: Option<BoundList<CellInfo<T>>>,
    /// Bound fully selected columns.
    pub columns: Option<BoundList<ColumnId>>,
}

impl<T> Default for Bindings<T> {
    fn default() -> Self {
        Self {
            items: None,
            cells: None,
            columns: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::message::Inbox;

    fn bound(inbox: &Inbox<u32>) -> BoundList<u32> {
        BoundList::bind(
            Arc::new(ObservableList::new()),
            "selected_items",
            inbox.sender(),
            GridMessage::SelectedItemsBinding,
        )
    }

    #[test]
    fn test_host_edits_are_forwarded() {
        let inbox = Inbox::new();
        let binding = bound(&inbox);
        binding.list().push(7);
        let messages = inbox.drain();
        assert_eq!(messages.len(), 1);
        assert!(matches!(
            messages[0],
            GridMessage::SelectedItemsBinding(CollectionChange::Add { index: 0, .. })
        ));
    }

    #[test]
    fn test_grid_writes_are_not_forwarded() {
        let inbox = Inbox::new();
        let binding = bound(&inbox);
        assert_eq!(binding.push_delta(&[1, 2], &[]), 2);
        assert_eq!(binding.push_delta(&[2], &[1]), 1);
        assert_eq!(binding.list().to_vec(), vec![2]);
        assert!(inbox.is_empty());
    }

    #[test]
    fn test_agreeing_delta_writes_nothing() {
        let inbox = Inbox::new();
        let binding = bound(&inbox);
        binding.list().push(3);
        inbox.drain();

        assert_eq!(binding.push_delta(&[3], &[9]), 0);
        assert!(!binding.reset_to(vec![3]));
        assert!(binding.reset_to(vec![4, 5]));
        assert_eq!(binding.list().len(), 2);
        assert!(inbox.is_empty());
    }
}
