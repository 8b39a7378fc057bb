//! Data models shared across indexing and retrieval.

use serde::{Deserialize, Serialize};

/// One knowledge chunk stored in the index.
///
/// Passages are produced offline by the corpus build tool; `source` names the
/// corpus document or page the text came from (e.g., `page_012.png`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Stable unique identifier within the index.
    pub id: String,
    /// Passage text (Chinese math notes with LaTeX formulas).
    pub text: String,
    /// Originating corpus document/page.
    pub source: String,
}

/// A passage together with its similarity score for one query.
///
/// Scores are similarity-ordered regardless of the index metric: inner
/// product as-is, Euclidean distance negated (see [`crate::Metric`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    /// Similarity score (higher is more similar).
    pub score: f32,
    /// The matched passage.
    pub passage: Passage,
}
