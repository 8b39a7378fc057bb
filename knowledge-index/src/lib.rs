//! File-persisted embedding index with exact top-k retrieval.
//!
//! This crate provides a clean API to:
//! - Build an index directory (`meta.json` + `passages.jsonl` + `vectors.bin`)
//!   from embedded passages
//! - Load it back and answer nearest-neighbor queries over the full corpus
//! - Retrieve context for a textual query through a pluggable embedding
//!   provider, with a relevance floor
//!
//! The design is flat (no deep nesting) and splits responsibilities into focused modules.

mod errors;
mod format;
mod index;
mod passage;
mod retrieve;

pub mod embed;

pub use embed::EmbeddingsProvider;
pub use errors::IndexError;
pub use format::{normalize, write_index, IndexMeta, Metric};
pub use index::EmbeddingIndex;
pub use passage::{Passage, ScoredPassage};
pub use retrieve::RetrievalQuery;

use std::path::Path;
use tracing::trace;

/// High-level facade over a loaded index.
///
/// This is the single entry point recommended for application code.
pub struct KnowledgeStore {
    index: EmbeddingIndex,
}

impl KnowledgeStore {
    /// Opens an index directory written by [`write_index`].
    ///
    /// # Errors
    /// Returns `IndexError::Io`/`Parse`/`Corrupt` if the artifacts are
    /// missing, malformed, or inconsistent.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, IndexError> {
        trace!("KnowledgeStore::open dir={:?}", dir.as_ref());
        let index = EmbeddingIndex::load(dir)?;
        Ok(Self { index })
    }

    /// Wraps an already-loaded index.
    pub fn from_index(index: EmbeddingIndex) -> Self {
        Self { index }
    }

    /// Performs a low-level vector search and returns scored passages.
    ///
    /// # Errors
    /// Returns `IndexError::InvalidK` or `IndexError::DimensionMismatch`.
    pub fn search_by_vector(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPassage>, IndexError> {
        trace!("KnowledgeStore::search_by_vector top_k={top_k}");
        self.index.query(query_vector, top_k)
    }

    /// Retrieves context passages for a textual query using the provided
    /// embedding provider. An empty result means nothing scored above the
    /// floor and is not an error.
    ///
    /// # Errors
    /// Returns embedding provider errors or search failures.
    pub async fn retrieve_context(
        &self,
        query: RetrievalQuery<'_>,
        provider: &dyn EmbeddingsProvider,
    ) -> Result<Vec<ScoredPassage>, IndexError> {
        trace!("KnowledgeStore::retrieve_context top_k={}", query.top_k);
        retrieve::retrieve(&self.index, query, provider).await
    }

    /// Read access to the underlying index (dimension, metric, lookups).
    pub fn index(&self) -> &EmbeddingIndex {
        &self.index
    }
}
