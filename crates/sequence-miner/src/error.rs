//! Mining Error Types

use thiserror::Error;

/// Errors during pattern mining
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MiningError {
    /// Database holds no sequences
    #[error("Empty input: sequence database has no sequences")]
    EmptyInput,

    /// Attribute values do not line up with the event sequences
    #[error("Shape mismatch in attribute '{attribute}': {detail}")]
    ShapeMismatch { attribute: String, detail: String },

    /// Invalid mining parameters
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed constraint or reference to an undeclared attribute
    #[error("Constraint error: {0}")]
    Constraint(String),

    /// Search stopped through its cancellation token
    #[error("Mining cancelled")]
    Cancelled,

    /// Search ran past its deadline
    #[error("Mining deadline exceeded")]
    DeadlineExceeded,
}
