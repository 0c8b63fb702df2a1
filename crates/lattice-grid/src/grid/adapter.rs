//! Bridge between the grid and a pluggable [`SelectionModel`].
//!
//! The adapter owns the grid's connection to the model. It forwards the
//! model's signals into the grid's inbox and pushes grid-side selection
//! changes into the model.
//!
//! Two [`SyncFlag`]s keep the directions apart:
//!
//! - `to_model` is held for the whole of every push. The model's change
//!   signals fire synchronously during the push; the forwarding slots see the
//!   flag and drop them, so the grid never reacts to its own writes.
//! - `from_model` is held while the grid applies model state to itself.
//!   Pushes attempted meanwhile are no-ops.
//!
//! ```text
//!        push (to_model)                 pull (from_model)
//! Idle ───────────────────> Syncing ───> Idle <─────────────── Syncing
//! ```

use std::sync::Arc;

use crossbeam_channel::Sender;
use lattice_grid_core::logging::targets;
use lattice_grid_core::{ConnectionGuard, Signal, SyncFlag, SyncGuard};

use super::message::{GridMessage, forward};
use super::selection::SelectionAction;
use crate::error::{GridError, Result};
use crate::model::{
    GridItem, IndexSelectionModel, IndexesChange, ItemSource, SelectionModel, SelectionModelChange,
    SelectionModelProperty,
};

fn selection_changed<'a, T: 'static>(
    model: &'a (dyn SelectionModel<T> + 'static),
) -> &'a Signal<SelectionModelChange<T>> {
    &model.signals().selection_changed
}

fn indexes_changed<'a, T: 'static>(
    model: &'a (dyn SelectionModel<T> + 'static),
) -> &'a Signal<IndexesChange> {
    &model.signals().indexes_changed
}

fn lost_selection<'a, T: 'static>(model: &'a (dyn SelectionModel<T> + 'static)) -> &'a Signal<()> {
    &model.signals().lost_selection
}

fn source_reset<'a, T: 'static>(model: &'a (dyn SelectionModel<T> + 'static)) -> &'a Signal<()> {
    &model.signals().source_reset
}

fn property_changed<'a, T: 'static>(
    model: &'a (dyn SelectionModel<T> + 'static),
) -> &'a Signal<SelectionModelProperty> {
    &model.signals().property_changed
}

/// The grid's attachment to a selection model.
pub struct SelectionModelAdapter<T> {
    model: Arc<dyn SelectionModel<T>>,
    owned: bool,
    to_model: SyncFlag,
    from_model: SyncFlag,
    _connections: Vec<ConnectionGuard>,
}

impl<T: GridItem> SelectionModelAdapter<T> {
    /// Attach to `model`, forwarding its signals to `sender`.
    ///
    /// `owned` marks the grid's own default model. Fails if the model is
    /// already attached to another grid.
    pub fn attach(
        model: Arc<dyn SelectionModel<T>>,
        owned: bool,
        sender: Sender<GridMessage<T>>,
    ) -> Result<Self> {
        if model.is_attached() {
            return Err(GridError::SelectionModelAttached);
        }
        Ok(Self::connect_all(model, owned, sender))
    }

    /// Attach to a fresh default model.
    pub fn with_default_model(single_select: bool, sender: Sender<GridMessage<T>>) -> Self {
        let model = IndexSelectionModel::new();
        model.set_single_select(single_select);
        Self::connect_all(Arc::new(model), true, sender)
    }

    fn connect_all(
        model: Arc<dyn SelectionModel<T>>,
        owned: bool,
        sender: Sender<GridMessage<T>>,
    ) -> Self {
        model.set_attached(true);

        let to_model = SyncFlag::new("selection_model");
        let from_model = SyncFlag::new("selection_model_pull");
        let connections = vec![
            Self::connect(&model, selection_changed::<T>, &to_model, &sender, |_| {
                GridMessage::ModelSelectionChanged
            }),
            Self::connect(&model, indexes_changed::<T>, &to_model, &sender, |_| {
                GridMessage::ModelIndexesChanged
            }),
            Self::connect(&model, lost_selection::<T>, &to_model, &sender, |_| {
                GridMessage::ModelLostSelection
            }),
            Self::connect(&model, source_reset::<T>, &to_model, &sender, |_| {
                GridMessage::ModelSourceReset
            }),
            Self::connect(&model, property_changed::<T>, &to_model, &sender, |p| {
                GridMessage::ModelPropertyChanged(*p)
            }),
        ];

        tracing::debug!(target: targets::ADAPTER, owned, "selection model attached");
        Self {
            model,
            owned,
            to_model,
            from_model,
            _connections: connections,
        }
    }

    fn connect<A, M>(
        model: &Arc<dyn SelectionModel<T>>,
        signal: for<'a> fn(&'a (dyn SelectionModel<T> + 'static)) -> &'a Signal<A>,
        to_model: &SyncFlag,
        sender: &Sender<GridMessage<T>>,
        message: M,
    ) -> ConnectionGuard
    where
        A: Send + 'static,
        M: Fn(&A) -> GridMessage<T> + Send + Sync + 'static,
    {
        let to_model = to_model.clone();
        let sender = sender.clone();
        Signal::connect_guarded(model, signal, move |args| {
            if to_model.is_set() {
                tracing::trace!(target: targets::ADAPTER, "echo of grid push dropped");
                return;
            }
            forward(&sender, message(args));
        })
    }

    // =========================================================================
    // State
    // =========================================================================

    /// The attached model.
    pub fn model(&self) -> &Arc<dyn SelectionModel<T>> {
        &self.model
    }

    /// Returns `true` for the grid's own default model.
    pub fn is_owned(&self) -> bool {
        self.owned
    }

    /// Enter the model → grid direction.
    ///
    /// Returns `None` if either direction is already active.
    pub fn begin_pull(&self) -> Option<SyncGuard> {
        if self.to_model.is_set() {
            tracing::trace!(target: targets::ADAPTER, "pull skipped during push");
            return None;
        }
        self.from_model.try_enter()
    }

    /// Returns `true` if the model allows one selected index at most.
    pub fn single_select(&self) -> bool {
        self.model.single_select()
    }

    // =========================================================================
    // Pushes
    // =========================================================================

    /// Run `f` against the model with echo suppression.
    ///
    /// Returns `false` without calling `f` when a sync in either direction is
    /// already running.
    fn push<F>(&self, f: F) -> bool
    where
        F: FnOnce(&dyn SelectionModel<T>),
    {
        if self.from_model.is_set() {
            tracing::trace!(target: targets::ADAPTER, "push skipped during pull");
            return false;
        }
        let Some(_guard) = self.to_model.try_enter() else {
            return false;
        };
        f(self.model.as_ref());
        true
    }

    fn batched<F>(model: &dyn SelectionModel<T>, f: F)
    where
        F: FnOnce(&dyn SelectionModel<T>),
    {
        model.begin_batch_update();
        f(model);
        if let Err(err) = model.end_batch_update() {
            tracing::warn!(target: targets::ADAPTER, %err, "selection model batch left unbalanced");
        }
    }

    /// Select one index.
    pub fn select(&self, index: usize) -> bool {
        self.push(|m| m.select(index))
    }

    /// Deselect one index.
    pub fn deselect(&self, index: usize) -> bool {
        self.push(|m| m.deselect(index))
    }

    /// Select the closed index range between `start` and `end`, in either
    /// order. With `replace` the previous selection is cleared in the same
    /// batch.
    pub fn select_range(&self, start: usize, end: usize, replace: bool) -> bool {
        self.push(|m| {
            Self::batched(m, |m| {
                if replace {
                    m.clear();
                }
                m.select_range(start, end);
            })
        })
    }

    /// Select every index of the model's source.
    pub fn select_all(&self) -> bool {
        self.push(|m| m.select_all())
    }

    /// Deselect everything.
    pub fn clear(&self) -> bool {
        self.push(|m| m.clear())
    }

    /// Replace the selection with `indexes`, making `primary` the selected
    /// index when given.
    pub fn replace_selection(&self, indexes: &[usize], primary: Option<usize>) -> bool {
        self.push(|m| {
            Self::batched(m, |m| {
                m.clear();
                if let Some(primary) = primary {
                    m.select(primary);
                }
                for &index in indexes {
                    m.select(index);
                }
            })
        })
    }

    /// Deselect and select index lists in one batch.
    pub fn apply_delta(&self, select: &[usize], deselect: &[usize]) -> bool {
        if select.is_empty() && deselect.is_empty() {
            return true;
        }
        self.push(|m| {
            Self::batched(m, |m| {
                for &index in deselect {
                    m.deselect(index);
                }
                for &index in select {
                    m.select(index);
                }
            })
        })
    }

    /// Push a selection action targeting `index`.
    ///
    /// `anchor` is the anchor's model index; `range_allowed` is the grid's
    /// decision whether anchor ranges apply. When it is `false` a range
    /// request degrades to selecting the target alone.
    pub fn apply_action(
        &self,
        action: SelectionAction,
        index: usize,
        anchor: Option<usize>,
        range_allowed: bool,
    ) -> bool {
        match action {
            SelectionAction::None => true,
            SelectionAction::AddCurrentToSelection => self.select(index),
            SelectionAction::RemoveCurrentFromSelection => self.deselect(index),
            SelectionAction::SelectFromAnchorToCurrent => match anchor {
                Some(anchor) if range_allowed => self.select_range(anchor, index, true),
                _ => self.apply_action(SelectionAction::SelectCurrent, index, None, false),
            },
            SelectionAction::SelectCurrent => self.push(|m| {
                Self::batched(m, |m| {
                    m.clear();
                    m.select(index);
                })
            }),
        }
    }

    /// Point the model at a new source.
    pub fn set_source(&self, source: Option<Arc<dyn ItemSource<T>>>) -> bool {
        self.push(|m| m.set_source(source))
    }

    /// Set the model's single-select flag.
    pub fn set_single_select(&self, single_select: bool) -> bool {
        self.push(|m| m.set_single_select(single_select))
    }

    /// Tell the model that items were inserted into its source.
    pub fn items_inserted(&self, index: usize, count: usize) -> bool {
        self.push(|m| m.on_source_items_inserted(index, count))
    }

    /// Tell the model that items were removed from its source.
    pub fn items_removed(&self, index: usize, count: usize) -> bool {
        self.push(|m| m.on_source_items_removed(index, count))
    }

    /// Tell the model that one item moved, carrying its selection state.
    pub fn item_moved(&self, old_index: usize, new_index: usize) -> bool {
        self.push(|m| {
            let selected = m.is_selected(old_index);
            m.on_source_items_removed(old_index, 1);
            m.on_source_items_inserted(new_index, 1);
            if selected {
                m.select(new_index);
            }
        })
    }

    /// Tell the model that its source was reset.
    pub fn source_reset(&self) -> bool {
        self.push(|m| m.on_source_reset())
    }

    /// Detach the model's source around `f`, then restore `source` and
    /// select `indexes`.
    ///
    /// Used for bulk remaps so the source does not re-evaluate mid-update.
    pub fn reattach_with(
        &self,
        source: Option<Arc<dyn ItemSource<T>>>,
        indexes: &[usize],
        primary: Option<usize>,
    ) -> bool {
        self.push(|m| {
            m.set_source(None);
            m.set_source(source);
            Self::batched(m, |m| {
                if let Some(primary) = primary {
                    m.select(primary);
                }
                for &index in indexes {
                    m.select(index);
                }
            });
        })
    }
}

impl<T> Drop for SelectionModelAdapter<T> {
    fn drop(&mut self) {
        self.model.set_attached(false);
        tracing::debug!(target: targets::ADAPTER, owned = self.owned, "selection model detached");
    }
}

impl<T> std::fmt::Debug for SelectionModelAdapter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionModelAdapter")
            .field("owned", &self.owned)
            .field("to_model", &self.to_model)
            .field("from_model", &self.from_model)
            .finish()
    }
}
