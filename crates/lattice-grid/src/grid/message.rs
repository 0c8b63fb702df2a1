//! The grid's inbox.
//!
//! Every model signal the grid listens to forwards a typed [`GridMessage`]
//! into one unbounded channel. The grid drains it from a single dispatch
//! point, so model swaps only need to drop connection guards; no handler is
//! ever wired to grid state directly.

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use lattice_grid_core::CollectionChange;

use super::cells::CellInfo;
use super::columns::ColumnId;
use crate::model::{FlattenedChangedArgs, SelectionModelProperty};

/// A notification waiting to be processed by the grid.
#[derive(Debug, Clone)]
pub enum GridMessage<T> {
    /// The selection model's selection changed outside a grid push.
    ModelSelectionChanged,
    /// The selection model shifted its indexes.
    ModelIndexesChanged,
    /// Selected items were removed from the selection model's source.
    ModelLostSelection,
    /// The selection model's source was reset.
    ModelSourceReset,
    /// A selection model property changed.
    ModelPropertyChanged(SelectionModelProperty),
    /// The flat data source changed.
    SourceChanged(CollectionChange<T>),
    /// The hierarchical data source changed shape.
    HierarchyChanged(FlattenedChangedArgs),
    /// The collection view's current position moved.
    CurrentChanged(Option<usize>),
    /// The bound selected-items list changed.
    SelectedItemsBinding(CollectionChange<T>),
    /// The bound selected-cells list changed.
    SelectedCellsBinding(CollectionChange<CellInfo<T>>),
    /// The bound selected-columns list changed.
    SelectedColumnsBinding(CollectionChange<ColumnId>),
}

impl<T> GridMessage<T> {
    /// Returns `true` for messages produced by the data source.
    pub fn is_data_change(&self) -> bool {
        matches!(self, Self::SourceChanged(_) | Self::HierarchyChanged(_))
    }

    /// Returns `true` for messages produced by the selection model.
    pub fn is_model_change(&self) -> bool {
        matches!(
            self,
            Self::ModelSelectionChanged
                | Self::ModelIndexesChanged
                | Self::ModelLostSelection
                | Self::ModelSourceReset
                | Self::ModelPropertyChanged(_)
        )
    }
}

/// Sending and receiving ends of the grid's message channel.
#[derive(Debug)]
pub struct Inbox<T> {
    sender: Sender<GridMessage<T>>,
    receiver: Receiver<GridMessage<T>>,
}

impl<T> Inbox<T> {
    /// Create an empty inbox.
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    /// A sender to hand to signal slots.
    pub fn sender(&self) -> Sender<GridMessage<T>> {
        self.sender.clone()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Take every queued message.
    pub fn drain(&self) -> Vec<GridMessage<T>> {
        let mut messages = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(message) => messages.push(message),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        messages
    }

    /// Drop queued messages matching `predicate`, keeping the rest in order.
    ///
    /// Returns the number of messages dropped.
    pub fn discard<F>(&self, predicate: F) -> usize
    where
        F: Fn(&GridMessage<T>) -> bool,
    {
        let mut dropped = 0;
        for message in self.drain() {
            if predicate(&message) {
                dropped += 1;
            } else {
                // The receiver lives in `self`, so the channel is connected.
                let _ = self.sender.send(message);
            }
        }
        dropped
    }
}

impl<T> Default for Inbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward a message from a signal slot. Sending only fails once the grid
/// has been dropped, at which point the message has nowhere to go.
pub(crate) fn forward<T>(sender: &Sender<GridMessage<T>>, message: GridMessage<T>) {
    let _ = sender.send(message);
}
