//! Error types for Lattice Grid core primitives.

/// Errors raised by core primitives.
///
/// These indicate programmer error in host code (misuse of an API), not
/// recoverable runtime conditions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// An operation was called in a state that does not allow it.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A scoped begin/end pair was closed more times than it was opened.
    #[error("Unbalanced guard: '{0}' ended without a matching begin")]
    UnbalancedGuard(&'static str),
}

impl CoreError {
    /// Create an invalid-operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }
}

/// A specialized Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::invalid_operation("column is detached");
        assert_eq!(err.to_string(), "Invalid operation: column is detached");

        let err = CoreError::UnbalancedGuard("batch_update");
        assert_eq!(
            err.to_string(),
            "Unbalanced guard: 'batch_update' ended without a matching begin"
        );
    }
}
