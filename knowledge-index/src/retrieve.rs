//! Retrieval: embeds the query text, searches the index, applies the
//! relevance floor.

use tracing::{debug, trace};

use crate::embed::EmbeddingsProvider;
use crate::errors::IndexError;
use crate::index::EmbeddingIndex;
use crate::passage::ScoredPassage;

/// Parameters for one retrieval call.
pub struct RetrievalQuery<'a> {
    /// Query text, embedded with the same model the corpus was built with.
    pub text: &'a str,
    /// Maximum number of passages to return.
    pub top_k: usize,
    /// Hits scoring below this are dropped. Operates in the index metric's
    /// similarity space (negated distances for Euclidean indexes).
    pub min_score: f32,
}

/// Embeds `query.text` and returns the passages that survive the relevance
/// floor, best first.
///
/// Returning an empty vector is a normal outcome, not an error: it means
/// nothing in the corpus was relevant enough, and callers are expected to
/// proceed without context.
///
/// # Errors
/// Returns embedding provider failures and [`EmbeddingIndex::query`] errors
/// unchanged.
pub async fn retrieve(
    index: &EmbeddingIndex,
    query: RetrievalQuery<'_>,
    provider: &dyn EmbeddingsProvider,
) -> Result<Vec<ScoredPassage>, IndexError> {
    trace!(
        "retrieve::passages top_k={} min_score={}",
        query.top_k,
        query.min_score
    );

    let qv = provider.embed(query.text).await?;
    let mut hits = index.query(&qv, query.top_k)?;

    let scanned = hits.len();
    hits.retain(|h| h.score >= query.min_score);
    debug!(
        "retrieve::passages kept={} dropped={}",
        hits.len(),
        scanned - hits.len()
    );

    Ok(hits)
}
