//! Reactive properties.
//!
//! [`Property<T>`] wraps a value and reports whether a write actually changed
//! it. Owners pair a property with a [`Signal`](crate::Signal) and emit only
//! when [`Property::set`] returns `true`.
//!
//! [`Property::set_silent`] writes without reporting a change. The grid uses
//! it to roll a public property back to its previous value when a requested
//! selection change is rejected, so observers never see the rejected value.
//!
//! # Example
//!
//! ```
//! use lattice_grid_core::{Property, Signal};
//!
//! struct Picker {
//!     selected: Property<Option<usize>>,
//!     selected_changed: Signal<Option<usize>>,
//! }
//!
//! impl Picker {
//!     fn select(&self, index: Option<usize>) {
//!         if self.selected.set(index) {
//!             self.selected_changed.emit(index);
//!         }
//!     }
//! }
//!
//! let picker = Picker { selected: Property::new(None), selected_changed: Signal::new() };
//! picker.select(Some(3));
//! picker.select(Some(3));
//! assert_eq!(picker.selected.get(), Some(3));
//! ```

use std::fmt;

use parking_lot::RwLock;

/// A value cell whose writes report whether they changed anything.
///
/// Reads take a shared lock, so a property can be read from inside a slot
/// connected to the signal it feeds.
pub struct Property<T> {
    value: RwLock<T>,
}

impl<T: Clone> Property<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// A clone of the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Overwrite the value without reporting a change, for rollback.
    pub fn set_silent(&self, value: T) {
        *self.value.write() = value;
    }
}

impl<T: Clone + PartialEq> Property<T> {
    /// Store `value`; `true` when it differs from the previous value.
    pub fn set(&self, value: T) -> bool {
        self.replace(value).is_some()
    }

    /// Store `value` and hand back the previous one, or `None` when the
    /// write was a no-op.
    pub fn replace(&self, value: T) -> Option<T> {
        let mut current = self.value.write();
        (*current != value).then(|| std::mem::replace(&mut *current, value))
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Property").field(&*self.value.read()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_set_detects_change() {
        let prop = Property::new(Some(4usize));

        assert!(!prop.set(Some(4)));
        assert!(prop.set(None));
        assert_eq!(prop.get(), None);
    }

    #[test]
    fn test_property_set_silent_is_rollback() {
        let prop = Property::new(Some(3usize));
        let previous = prop.get();

        assert!(prop.set(Some(7)));
        prop.set_silent(previous);
        assert_eq!(prop.get(), Some(3));
    }

    #[test]
    fn test_property_replace() {
        let prop = Property::new("a".to_string());

        assert!(prop.replace("a".to_string()).is_none());
        assert_eq!(prop.replace("b".to_string()), Some("a".to_string()));
        assert_eq!(prop.get(), "b");
    }

    #[test]
    fn test_property_replace_reports_previous_selection() {
        let prop = Property::new(None::<usize>);

        assert_eq!(prop.replace(Some(1)), Some(None));
        assert_eq!(prop.replace(Some(1)), None);
        assert_eq!(prop.replace(None), Some(Some(1)));
    }
}
