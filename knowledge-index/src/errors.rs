//! Error types for the `knowledge-index` crate.

use thiserror::Error;

/// Unified error for index persistence, queries, and retrieval.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Filesystem I/O failure while reading or writing index artifacts.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failure (meta.json or a passages.jsonl row).
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The persisted artifacts are structurally broken or disagree with
    /// each other (bad magic, truncated data, count/dimension mismatch,
    /// zero dimension, duplicate ids).
    #[error("corrupt index: {0}")]
    Corrupt(String),

    /// A vector with the wrong dimensionality was passed to the index.
    #[error("vector dimension mismatch: got {got}, want {want}")]
    DimensionMismatch {
        /// Dimension of the offending vector.
        got: usize,
        /// Dimension the index was built with.
        want: usize,
    },

    /// A non-positive result count was requested.
    #[error("invalid top-k: {0} (must be >= 1)")]
    InvalidK(usize),

    /// The injected embeddings provider failed.
    #[error("embedding provider error: {0}")]
    Embedding(String),
}

impl IndexError {
    /// Whether this error belongs to the load-failure class (missing,
    /// unreadable, or structurally corrupt artifacts).
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            IndexError::Io(_) | IndexError::Parse(_) | IndexError::Corrupt(_)
        )
    }
}
