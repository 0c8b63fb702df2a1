//! Core traits shared by the grid and its models.

use std::fmt;

/// Marker for types that can be displayed as grid rows.
///
/// Item identity is `PartialEq` equality: selection snapshots taken before a
/// reset are restored by finding equal items in the new index space.
pub trait GridItem: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {}

impl<T> GridItem for T where T: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {}

/// An indexable sequence of items.
///
/// This is what a [`SelectionModel`](super::SelectionModel) sees as its
/// source: the unpaged view of a flat collection, or the flattened rows of a
/// hierarchy.
pub trait ItemSource<T>: Send + Sync {
    /// Number of items.
    fn len(&self) -> usize;

    /// Clone of the item at `index`.
    fn item(&self, index: usize) -> Option<T>;

    /// Position of the first item equal to `item`.
    fn index_of(&self, item: &T) -> Option<usize>;

    /// Returns `true` if the source has no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An `ItemSource` over a plain vector, handy for hosts and tests.
#[derive(Debug, Clone, Default)]
pub struct VecSource<T> {
    items: Vec<T>,
}

impl<T> VecSource<T> {
    /// Wrap a vector.
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }
}

impl<T: Clone + PartialEq + Send + Sync> ItemSource<T> for VecSource<T> {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn item(&self, index: usize) -> Option<T> {
        self.items.get(index).cloned()
    }

    fn index_of(&self, item: &T) -> Option<usize> {
        self.items.iter().position(|i| i == item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_source() {
        let source = VecSource::new(vec!["a", "b", "c"]);
        assert_eq!(source.len(), 3);
        assert!(!source.is_empty());
        assert_eq!(source.item(1), Some("b"));
        assert_eq!(source.item(3), None);
        assert_eq!(source.index_of(&"c"), Some(2));
        assert_eq!(source.index_of(&"z"), None);
    }
}
