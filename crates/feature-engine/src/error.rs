//! Pipeline Error Types

use feature_selector::SelectionError;
use sequence_miner::MiningError;
use text_embedder::EmbedError;
use thiserror::Error;

/// Errors while assembling features
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Structured feature reduction failed
    #[error("Feature selection failed: {0}")]
    Selection(#[from] SelectionError),

    /// Text embedding failed
    #[error("Text embedding failed: {0}")]
    Embedding(#[from] EmbedError),

    /// Sequential pattern mining failed
    #[error("Pattern mining failed: {0}")]
    Mining(#[from] MiningError),

    /// Stage input row count differs from the entity count
    #[error("{stage} input has {actual} rows, expected {expected}")]
    DataShape {
        stage: String,
        expected: usize,
        actual: usize,
    },

    /// Nothing to build a table from
    #[error("Empty input: {0}")]
    EmptyInput(&'static str),

    /// Two feature columns share a name
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    /// Two rows share an entity id
    #[error("Duplicate entity id: {0}")]
    DuplicateEntity(String),

    /// Configuration file or environment could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
