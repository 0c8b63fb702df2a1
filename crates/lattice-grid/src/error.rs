//! Error types for the grid.
//!
//! Only programmer misuse is reported as an error. Bounds violations and stale
//! references produced by virtualization or asynchronous data changes are
//! handled as `None`/`false` returns, and a selection change rejected by an
//! edit commit is reported by the operation's `bool` result.

use lattice_grid_core::CoreError;

use crate::grid::ColumnId;

/// Errors raised by grid and selection-model operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// An operation was called in a state that does not allow it.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// `end_batch_update` was called without a matching `begin_batch_update`.
    #[error("end_batch_update called without a matching begin_batch_update")]
    BatchUpdateNotStarted,

    /// A column index was outside the column collection.
    #[error("Column index {index} is out of range (column count: {count})")]
    ColumnOutOfRange { index: usize, count: usize },

    /// A column id no longer belongs to the grid.
    #[error("Column {0:?} is not attached to this grid")]
    DetachedColumn(ColumnId),

    /// The selection model is already driving another grid.
    #[error("Selection model is already attached to another grid")]
    SelectionModelAttached,

    /// Error from a core primitive.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl GridError {
    /// Create an invalid-operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }
}

/// A specialized Result type for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GridError::ColumnOutOfRange { index: 7, count: 3 };
        assert_eq!(
            err.to_string(),
            "Column index 7 is out of range (column count: 3)"
        );
        assert_eq!(
            GridError::invalid_operation("no source").to_string(),
            "Invalid operation: no source"
        );
    }

    #[test]
    fn test_core_error_converts() {
        let err: GridError = CoreError::UnbalancedGuard("defer").into();
        assert!(matches!(err, GridError::Core(_)));
        assert_eq!(
            err.to_string(),
            "Unbalanced guard: 'defer' ended without a matching begin"
        );
    }
}
