//! In-memory embedding index loaded from a persisted directory.
//!
//! The whole corpus is held as one flat `f32` buffer and scanned exactly on
//! every query. Corpora here are small (hundreds to low thousands of
//! passages), so an exact scan is both simpler and more predictable than an
//! approximate structure.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::path::Path;

use tracing::{debug, trace};

use crate::errors::IndexError;
use crate::format::{self, IndexMeta, Metric, VECTORS_VERSION};
use crate::passage::{Passage, ScoredPassage};

/// Read-only vector index over a passage corpus.
///
/// Loaded once at startup via [`EmbeddingIndex::load`] and then shared
/// behind an `Arc`. Queries never mutate the index.
#[derive(Debug)]
pub struct EmbeddingIndex {
    meta: IndexMeta,
    passages: Vec<Passage>,
    /// Row-major `passage_count * dimension` matrix.
    vectors: Vec<f32>,
    by_id: HashMap<String, usize>,
}

impl EmbeddingIndex {
    /// Loads and cross-validates the three index artifacts from `dir`.
    ///
    /// # Errors
    /// - [`IndexError::Io`] if any artifact is missing or unreadable
    /// - [`IndexError::Parse`] on malformed JSON
    /// - [`IndexError::Corrupt`] when the artifacts disagree with each other
    ///   (counts, dimension, version) or passage ids repeat
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, IndexError> {
        let dir = dir.as_ref();

        let meta = format::read_meta(dir)?;
        if meta.version != VECTORS_VERSION {
            return Err(IndexError::Corrupt(format!(
                "unsupported index version: {}",
                meta.version
            )));
        }

        let passages = format::read_passages(dir)?;
        let (vectors, dimension, count) = format::read_vectors(dir)?;

        if dimension != meta.dimension {
            return Err(IndexError::Corrupt(format!(
                "dimension disagreement: meta.json says {}, vectors.bin says {dimension}",
                meta.dimension
            )));
        }
        if count != meta.passage_count || passages.len() != meta.passage_count {
            return Err(IndexError::Corrupt(format!(
                "count disagreement: meta.json says {}, vectors.bin has {count}, passages.jsonl has {}",
                meta.passage_count,
                passages.len()
            )));
        }

        let mut by_id = HashMap::with_capacity(passages.len());
        for (i, p) in passages.iter().enumerate() {
            if by_id.insert(p.id.clone(), i).is_some() {
                return Err(IndexError::Corrupt(format!("duplicate passage id: {}", p.id)));
            }
        }

        debug!(
            target: "knowledge_index::index",
            dir = %dir.display(),
            passages = count,
            dimension,
            metric = ?meta.metric,
            "index loaded"
        );

        Ok(Self {
            meta,
            passages,
            vectors,
            by_id,
        })
    }

    /// Builds an index directly from parts, bypassing the filesystem.
    ///
    /// Runs the same consistency checks as [`EmbeddingIndex::load`]. Useful
    /// for corpus builds that query before persisting, and for tests.
    pub fn from_parts(
        meta: IndexMeta,
        passages: Vec<Passage>,
        vectors: Vec<f32>,
    ) -> Result<Self, IndexError> {
        if meta.dimension == 0 {
            return Err(IndexError::Corrupt("meta declares zero dimension".into()));
        }
        if passages.len() != meta.passage_count {
            return Err(IndexError::Corrupt(format!(
                "count disagreement: meta says {}, got {} passages",
                meta.passage_count,
                passages.len()
            )));
        }
        if vectors.len() != meta.passage_count * meta.dimension {
            return Err(IndexError::Corrupt(format!(
                "vector buffer length {} does not match {} x {}",
                vectors.len(),
                meta.passage_count,
                meta.dimension
            )));
        }

        let mut by_id = HashMap::with_capacity(passages.len());
        for (i, p) in passages.iter().enumerate() {
            if by_id.insert(p.id.clone(), i).is_some() {
                return Err(IndexError::Corrupt(format!("duplicate passage id: {}", p.id)));
            }
        }

        Ok(Self {
            meta,
            passages,
            vectors,
            by_id,
        })
    }

    /// Returns the `k` most similar passages to `query`, best first.
    ///
    /// Ties on score break toward the earlier passage in corpus order, so a
    /// query against a fixed index is fully deterministic. Fewer than `k`
    /// results are returned when the corpus is smaller than `k`. Non-finite
    /// scores are dropped.
    ///
    /// # Errors
    /// - [`IndexError::InvalidK`] if `k == 0`
    /// - [`IndexError::DimensionMismatch`] if `query.len()` differs from the
    ///   index dimension
    pub fn query(&self, query: &[f32], k: usize) -> Result<Vec<ScoredPassage>, IndexError> {
        if k == 0 {
            return Err(IndexError::InvalidK(k));
        }
        if query.len() != self.meta.dimension {
            return Err(IndexError::DimensionMismatch {
                got: query.len(),
                want: self.meta.dimension,
            });
        }

        let dim = self.meta.dimension;
        let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::with_capacity(k + 1);

        for (row, chunk) in self.vectors.chunks_exact(dim).enumerate() {
            let score = self.meta.metric.score(query, chunk);
            if !score.is_finite() {
                continue;
            }
            heap.push(HeapEntry { score, row });
            if heap.len() > k {
                // Evicts the current worst (lowest score, then highest row).
                heap.pop();
            }
        }

        let mut hits: Vec<HeapEntry> = heap.into_vec();
        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.row.cmp(&b.row))
        });

        trace!(
            target: "knowledge_index::index",
            k,
            hits = hits.len(),
            "query scanned"
        );

        Ok(hits
            .into_iter()
            .map(|e| ScoredPassage {
                score: e.score,
                passage: self.passages[e.row].clone(),
            })
            .collect())
    }

    /// Looks a passage up by its id.
    pub fn get(&self, id: &str) -> Option<&Passage> {
        self.by_id.get(id).map(|&i| &self.passages[i])
    }

    /// Number of passages in the corpus.
    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Vector dimensionality all queries must match.
    pub fn dimension(&self) -> usize {
        self.meta.dimension
    }

    pub fn metric(&self) -> Metric {
        self.meta.metric
    }

    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }
}

/// Heap entry ordered so that `BinaryHeap::pop` removes the worst candidate:
/// the lowest score, and on equal scores the highest row.
struct HeapEntry {
    score: f32,
    row: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.row.cmp(&other.row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{write_index, Metric};
    use tempfile::TempDir;

    fn passage(id: &str) -> Passage {
        Passage {
            id: id.into(),
            text: format!("知识点 {id}"),
            source: format!("page_{id}.png"),
        }
    }

    fn build(dir: &Path, metric: Metric, vectors: &[Vec<f32>]) -> EmbeddingIndex {
        let passages: Vec<Passage> = (0..vectors.len())
            .map(|i| passage(&format!("p{i}")))
            .collect();
        write_index(dir, "test-embedding", metric, &passages, vectors).unwrap();
        EmbeddingIndex::load(dir).unwrap()
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let index = build(
            dir.path(),
            Metric::InnerProduct,
            &[vec![1.0, 0.0], vec![0.0, 1.0]],
        );
        assert_eq!(index.len(), 2);
        assert_eq!(index.dimension(), 2);
        assert_eq!(index.get("p1").unwrap().source, "page_p1.png");
        assert!(index.get("missing").is_none());
    }

    #[test]
    fn query_returns_best_first() {
        let dir = TempDir::new().unwrap();
        let index = build(
            dir.path(),
            Metric::InnerProduct,
            &[
                vec![1.0, 0.0],  // aligned with query
                vec![0.0, 1.0],  // orthogonal
                vec![0.7, 0.7],  // in between
                vec![-1.0, 0.0], // opposite
            ],
        );

        let hits = index.query(&[1.0, 0.0], 3).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].passage.id, "p0");
        assert_eq!(hits[1].passage.id, "p2");
        assert_eq!(hits[2].passage.id, "p1");
        assert!(hits[0].score >= hits[1].score && hits[1].score >= hits[2].score);
    }

    #[test]
    fn equal_scores_break_toward_corpus_order() {
        let dir = TempDir::new().unwrap();
        // Three identical vectors, one worse.
        let index = build(
            dir.path(),
            Metric::InnerProduct,
            &[
                vec![0.5, 0.5],
                vec![0.5, 0.5],
                vec![0.5, 0.5],
                vec![0.0, 0.1],
            ],
        );

        let hits = index.query(&[1.0, 1.0], 2).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.passage.id.as_str()).collect();
        assert_eq!(ids, ["p0", "p1"]);
    }

    #[test]
    fn k_larger_than_corpus_returns_everything() {
        let dir = TempDir::new().unwrap();
        let index = build(
            dir.path(),
            Metric::InnerProduct,
            &[vec![1.0, 0.0], vec![0.0, 1.0]],
        );
        let hits = index.query(&[1.0, 0.0], 10).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn zero_k_is_rejected() {
        let dir = TempDir::new().unwrap();
        let index = build(dir.path(), Metric::InnerProduct, &[vec![1.0, 0.0]]);
        assert!(matches!(
            index.query(&[1.0, 0.0], 0),
            Err(IndexError::InvalidK(0))
        ));
    }

    #[test]
    fn wrong_query_dimension_is_rejected() {
        let dir = TempDir::new().unwrap();
        let index = build(dir.path(), Metric::InnerProduct, &[vec![1.0, 0.0]]);
        assert!(matches!(
            index.query(&[1.0, 0.0, 0.0], 1),
            Err(IndexError::DimensionMismatch { got: 3, want: 2 })
        ));
    }

    #[test]
    fn euclidean_prefers_the_nearest_vector() {
        let dir = TempDir::new().unwrap();
        let index = build(
            dir.path(),
            Metric::Euclidean,
            &[vec![10.0, 10.0], vec![1.1, 1.0], vec![5.0, 5.0]],
        );

        let hits = index.query(&[1.0, 1.0], 3).unwrap();
        assert_eq!(hits[0].passage.id, "p1");
        assert_eq!(hits[1].passage.id, "p2");
        assert_eq!(hits[2].passage.id, "p0");
        // Negated distances, so every score is non-positive here.
        assert!(hits.iter().all(|h| h.score <= 0.0));
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let err = EmbeddingIndex::load(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, IndexError::Io(_)));
        assert!(err.is_load_error());
    }

    #[test]
    fn meta_and_vectors_must_agree() {
        let dir = TempDir::new().unwrap();
        build(dir.path(), Metric::InnerProduct, &[vec![1.0, 0.0]]);

        // Rewrite meta.json with a different dimension.
        let meta_path = dir.path().join("meta.json");
        let raw = std::fs::read_to_string(&meta_path).unwrap();
        let patched = raw.replace("\"dimension\": 2", "\"dimension\": 4");
        assert_ne!(raw, patched);
        std::fs::write(&meta_path, patched).unwrap();

        let err = EmbeddingIndex::load(dir.path()).unwrap_err();
        assert!(matches!(err, IndexError::Corrupt(_)));
    }

    #[test]
    fn duplicate_ids_fail_to_load() {
        let dir = TempDir::new().unwrap();
        build(dir.path(), Metric::InnerProduct, &[vec![1.0, 0.0], vec![0.0, 1.0]]);

        // Hand-edit passages.jsonl so both lines carry the same id.
        let path = dir.path().join("passages.jsonl");
        let raw = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, raw.replace("p1", "p0")).unwrap();

        let err = EmbeddingIndex::load(dir.path()).unwrap_err();
        assert!(matches!(err, IndexError::Corrupt(_)));
    }

    #[test]
    fn from_parts_checks_buffer_shape() {
        let meta = IndexMeta {
            version: 1,
            embedding_model: "m".into(),
            dimension: 2,
            metric: Metric::InnerProduct,
            passage_count: 2,
            built_at: "2026-01-01T00:00:00Z".into(),
        };
        let err = EmbeddingIndex::from_parts(
            meta,
            vec![passage("a"), passage("b")],
            vec![1.0, 0.0, 0.0], // one float short
        )
        .unwrap_err();
        assert!(matches!(err, IndexError::Corrupt(_)));
    }
}
