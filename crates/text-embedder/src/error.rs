//! Embedding Error Types

use thiserror::Error;

/// Errors during embedding fit or transform
#[derive(Debug, Error)]
pub enum EmbedError {
    /// No documents supplied
    #[error("Empty input: no documents to embed")]
    EmptyInput,

    /// Invalid or inconsistent recipe parameters
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Frequency fitting kept no terms
    #[error("Vocabulary is empty after fitting (min_df={min_df})")]
    EmptyVocabulary { min_df: usize },

    /// Malformed word vector table
    #[error("Invalid word vector data at line {line}: {reason}")]
    WordVectorFormat { line: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fitted embedder (de)serialization failure
    #[error("Codec error: {0}")]
    Codec(#[from] postcard::Error),
}

impl EmbedError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
