//! Selection Error Types

use thiserror::Error;

/// Errors during column scoring and selection
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectionError {
    /// Invalid or inconsistent method parameters
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Column or label length disagrees with the row count
    #[error("{field} has {actual} rows, expected {expected}")]
    DataShape {
        field: String,
        expected: usize,
        actual: usize,
    },

    /// No columns or no rows to score
    #[error("Empty input: {0}")]
    EmptyInput(&'static str),

    /// Two columns share a name
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),
}

impl SelectionError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
