//! Observable lists.
//!
//! [`ObservableList<T>`] is a shared, interior-mutable list that reports every
//! mutation as a [`CollectionChange<T>`] on its `collection_changed` signal.
//! Host code binds one of these to a grid (for example as the grid's selected
//! items) and mutates it from either side.

use parking_lot::RwLock;

use crate::signal::Signal;

/// A single change to an observable collection.
///
/// Indices refer to positions in the collection at the time of the change.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionChange<T> {
    /// `items` were inserted starting at `index`.
    Add { index: usize, items: Vec<T> },
    /// `items` were removed starting at `index`.
    Remove { index: usize, items: Vec<T> },
    /// `old_items` at `index` were replaced by `new_items`.
    Replace {
        index: usize,
        old_items: Vec<T>,
        new_items: Vec<T>,
    },
    /// `items` moved from `old_index` to `new_index`.
    Move {
        old_index: usize,
        new_index: usize,
        items: Vec<T>,
    },
    /// The collection changed wholesale; observers must resynchronize.
    Reset,
}

impl<T> CollectionChange<T> {
    /// Items that are no longer in the collection after this change.
    ///
    /// Empty for `Reset`, which carries no item detail.
    pub fn removed_items(&self) -> &[T] {
        match self {
            Self::Remove { items, .. } => items,
            Self::Replace { old_items, .. } => old_items,
            _ => &[],
        }
    }

    /// Items that entered the collection with this change.
    pub fn added_items(&self) -> &[T] {
        match self {
            Self::Add { items, .. } => items,
            Self::Replace { new_items, .. } => new_items,
            _ => &[],
        }
    }
}

/// A list that emits [`CollectionChange`] notifications.
///
/// Signals are emitted after the internal lock is released, so slots may read
/// the list.
pub struct ObservableList<T> {
    items: RwLock<Vec<T>>,
    /// Emitted after every mutation.
    pub collection_changed: Signal<CollectionChange<T>>,
}

impl<T: Clone + PartialEq + Send + Sync + 'static> ObservableList<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Create a list with initial contents. No notification is emitted.
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            items: RwLock::new(items),
            collection_changed: Signal::new(),
        }
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns `true` if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Clone of the item at `index`.
    pub fn get(&self, index: usize) -> Option<T> {
        self.items.read().get(index).cloned()
    }

    /// Clone of the whole list.
    pub fn to_vec(&self) -> Vec<T> {
        self.items.read().clone()
    }

    /// Returns `true` if an equal item is present.
    pub fn contains(&self, item: &T) -> bool {
        self.items.read().contains(item)
    }

    /// Position of the first equal item.
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.items.read().iter().position(|i| i == item)
    }

    /// Append an item.
    pub fn push(&self, item: T) {
        let index = {
            let mut items = self.items.write();
            items.push(item.clone());
            items.len() - 1
        };
        self.collection_changed.emit(CollectionChange::Add {
            index,
            items: vec![item],
        });
    }

    /// Insert an item at `index` (clamped to the list length).
    pub fn insert(&self, index: usize, item: T) {
        let index = {
            let mut items = self.items.write();
            let index = index.min(items.len());
            items.insert(index, item.clone());
            index
        };
        self.collection_changed.emit(CollectionChange::Add {
            index,
            items: vec![item],
        });
    }

    /// Remove the first item equal to `item`. Returns `true` if one was removed.
    pub fn remove(&self, item: &T) -> bool {
        let removed = {
            let mut items = self.items.write();
            items
                .iter()
                .position(|i| i == item)
                .map(|index| (index, items.remove(index)))
        };
        match removed {
            Some((index, removed)) => {
                self.collection_changed.emit(CollectionChange::Remove {
                    index,
                    items: vec![removed],
                });
                true
            }
            None => false,
        }
    }

    /// Remove the item at `index`.
    pub fn remove_at(&self, index: usize) -> Option<T> {
        let removed = {
            let mut items = self.items.write();
            (index < items.len()).then(|| items.remove(index))
        }?;
        self.collection_changed.emit(CollectionChange::Remove {
            index,
            items: vec![removed.clone()],
        });
        Some(removed)
    }

    /// Replace the item at `index`. Returns the old item.
    pub fn replace(&self, index: usize, item: T) -> Option<T> {
        let old = {
            let mut items = self.items.write();
            let slot = items.get_mut(index)?;
            std::mem::replace(slot, item.clone())
        };
        self.collection_changed.emit(CollectionChange::Replace {
            index,
            old_items: vec![old.clone()],
            new_items: vec![item],
        });
        Some(old)
    }

    /// Move the item at `old_index` to `new_index`.
    pub fn move_item(&self, old_index: usize, new_index: usize) -> bool {
        let moved = {
            let mut items = self.items.write();
            if old_index >= items.len() || new_index >= items.len() {
                return false;
            }
            let item = items.remove(old_index);
            items.insert(new_index, item.clone());
            item
        };
        self.collection_changed.emit(CollectionChange::Move {
            old_index,
            new_index,
            items: vec![moved],
        });
        true
    }

    /// Remove every item and emit `Reset`.
    pub fn clear(&self) {
        self.items.write().clear();
        self.collection_changed.emit(CollectionChange::Reset);
    }

    /// Replace the whole contents and emit `Reset`.
    pub fn reset(&self, items: Vec<T>) {
        *self.items.write() = items;
        self.collection_changed.emit(CollectionChange::Reset);
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + std::fmt::Debug> std::fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.items.read().iter()).finish()
    }
}

static_assertions::assert_impl_all!(ObservableList<String>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn recorded(list: &ObservableList<&'static str>) -> Arc<Mutex<Vec<CollectionChange<&'static str>>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = log.clone();
        list.collection_changed.connect(move |change| {
            log_clone.lock().push(change.clone());
        });
        log
    }

    #[test]
    fn test_push_and_remove_emit_changes() {
        let list = ObservableList::new();
        let log = recorded(&list);

        list.push("a");
        list.push("b");
        assert!(list.remove(&"a"));
        assert!(!list.remove(&"zzz"));

        let log = log.lock();
        assert_eq!(log.len(), 3);
        assert_eq!(log[1], CollectionChange::Add { index: 1, items: vec!["b"] });
        assert_eq!(log[2], CollectionChange::Remove { index: 0, items: vec!["a"] });
        assert_eq!(list.to_vec(), vec!["b"]);
    }

    #[test]
    fn test_replace_and_move() {
        let list = ObservableList::from_vec(vec!["a", "b", "c"]);
        let log = recorded(&list);

        assert_eq!(list.replace(1, "x"), Some("b"));
        assert!(list.move_item(0, 2));
        assert_eq!(list.to_vec(), vec!["x", "c", "a"]);

        let log = log.lock();
        assert_eq!(log[0].removed_items(), &["b"]);
        assert_eq!(log[0].added_items(), &["x"]);
        assert!(matches!(log[1], CollectionChange::Move { old_index: 0, new_index: 2, .. }));
    }

    #[test]
    fn test_slot_can_read_list_during_emit() {
        let list = Arc::new(ObservableList::<u32>::new());
        let observed = Arc::new(Mutex::new(0));

        let list_clone = list.clone();
        let observed_clone = observed.clone();
        list.collection_changed.connect(move |_| {
            *observed_clone.lock() = list_clone.len();
        });

        list.push(7);
        assert_eq!(*observed.lock(), 1);
    }

    #[test]
    fn test_clear_emits_reset() {
        let list = ObservableList::from_vec(vec!["a"]);
        let log = recorded(&list);
        list.clear();
        assert!(list.is_empty());
        assert_eq!(log.lock()[0], CollectionChange::Reset);
    }
}
