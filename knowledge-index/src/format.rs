//! On-disk layout of a persisted index.
//!
//! An index directory contains exactly three artifacts:
//!
//! - `meta.json`      — [`IndexMeta`] (camelCase JSON)
//! - `passages.jsonl` — one [`Passage`] per line, in vector order
//! - `vectors.bin`    — `magic(u32) + version(u32) + dimension(u32) + count(u32)`
//!   followed by `count * dimension` little-endian `f32` values
//!
//! The dimension and similarity metric are fixed when the index is built and
//! recorded in both `meta.json` and the `vectors.bin` header; the loader
//! cross-checks them. Writes go through a temp file plus rename per artifact
//! so a crashed build never leaves a half-written file under the final name.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::IndexError;
use crate::passage::Passage;

pub(crate) const VECTORS_MAGIC: u32 = 0x4D4B4956; // "MKIV"
pub(crate) const VECTORS_VERSION: u32 = 1;

pub(crate) const META_FILE: &str = "meta.json";
pub(crate) const PASSAGES_FILE: &str = "passages.jsonl";
pub(crate) const VECTORS_FILE: &str = "vectors.bin";

/// Similarity metric of the vector space, fixed at build time.
///
/// Query scores are similarity-ordered for both variants: inner product is
/// used as-is (equals cosine for normalized embeddings), Euclidean distance
/// is **negated** so that a larger score always means more similar. The
/// relevance floor applied at retrieval time operates in the same space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Dot product (use with normalized embeddings).
    InnerProduct,
    /// Euclidean distance (L2), negated into a similarity.
    Euclidean,
}

impl Metric {
    /// Computes the similarity score between two equal-length vectors.
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::InnerProduct => dot(a, b),
            Metric::Euclidean => {
                let d2: f32 = a
                    .iter()
                    .zip(b.iter())
                    .map(|(x, y)| {
                        let d = x - y;
                        d * d
                    })
                    .sum();
                -d2.sqrt()
            }
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Normalizes a vector to unit length in place. Zero vectors are left as-is.
pub fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Descriptive metadata persisted next to the vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexMeta {
    /// Format version of the artifact set.
    pub version: u32,
    /// Embedding model the corpus vectors were produced with.
    pub embedding_model: String,
    /// Vector dimensionality (must be non-zero).
    pub dimension: usize,
    /// Similarity metric of the vector space.
    pub metric: Metric,
    /// Number of passages (and vectors) in the index.
    pub passage_count: usize,
    /// RFC3339 timestamp of the build.
    pub built_at: String,
}

/// Writes a complete index directory from passages and their vectors.
///
/// Intended for the offline corpus build tool and for test fixtures. The
/// passage order defines the vector order. Returns the [`IndexMeta`] that
/// was persisted.
///
/// # Errors
/// - [`IndexError::Corrupt`] if the input is empty, counts differ, vector
///   dimensions are not uniform/non-zero, or passage ids repeat
/// - [`IndexError::Io`] / [`IndexError::Parse`] on filesystem or JSON failures
pub fn write_index(
    dir: impl AsRef<Path>,
    embedding_model: &str,
    metric: Metric,
    passages: &[Passage],
    vectors: &[Vec<f32>],
) -> Result<IndexMeta, IndexError> {
    let dir = dir.as_ref();

    if passages.is_empty() {
        return Err(IndexError::Corrupt(
            "cannot build an index from zero passages".into(),
        ));
    }
    if passages.len() != vectors.len() {
        return Err(IndexError::Corrupt(format!(
            "passage/vector count mismatch: {} vs {}",
            passages.len(),
            vectors.len()
        )));
    }

    let dimension = vectors[0].len();
    if dimension == 0 {
        return Err(IndexError::Corrupt("vector dimension is zero".into()));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(IndexError::DimensionMismatch {
            got: bad.len(),
            want: dimension,
        });
    }

    let mut seen = std::collections::HashSet::with_capacity(passages.len());
    for p in passages {
        if !seen.insert(p.id.as_str()) {
            return Err(IndexError::Corrupt(format!("duplicate passage id: {}", p.id)));
        }
    }

    fs::create_dir_all(dir)?;

    let meta = IndexMeta {
        version: VECTORS_VERSION,
        embedding_model: embedding_model.to_string(),
        dimension,
        metric,
        passage_count: passages.len(),
        built_at: chrono::Utc::now().to_rfc3339(),
    };

    // meta.json
    write_atomic(dir, META_FILE, serde_json::to_string_pretty(&meta)?.as_bytes())?;

    // passages.jsonl
    let mut lines = Vec::new();
    for p in passages {
        lines.extend_from_slice(serde_json::to_string(p)?.as_bytes());
        lines.push(b'\n');
    }
    write_atomic(dir, PASSAGES_FILE, &lines)?;

    // vectors.bin: header + payload
    let mut bin = Vec::with_capacity(16 + passages.len() * dimension * 4);
    bin.extend_from_slice(&VECTORS_MAGIC.to_le_bytes());
    bin.extend_from_slice(&VECTORS_VERSION.to_le_bytes());
    bin.extend_from_slice(&(dimension as u32).to_le_bytes());
    bin.extend_from_slice(&(passages.len() as u32).to_le_bytes());
    for v in vectors {
        for x in v {
            bin.extend_from_slice(&x.to_le_bytes());
        }
    }
    write_atomic(dir, VECTORS_FILE, &bin)?;

    debug!(
        target: "knowledge_index::format",
        dir = %dir.display(),
        passages = meta.passage_count,
        dimension = meta.dimension,
        metric = ?meta.metric,
        "index written"
    );

    Ok(meta)
}

/// Writes `bytes` to `<dir>/<name>` via a temp file and rename.
fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> Result<(), IndexError> {
    let tmp = dir.join(format!(".{name}.tmp"));
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(&tmp, dir.join(name))?;
    Ok(())
}

/// Reads and validates `meta.json`.
pub(crate) fn read_meta(dir: &Path) -> Result<IndexMeta, IndexError> {
    let raw = fs::read_to_string(dir.join(META_FILE))?;
    let meta: IndexMeta = serde_json::from_str(&raw)?;
    if meta.dimension == 0 {
        return Err(IndexError::Corrupt("meta declares zero dimension".into()));
    }
    Ok(meta)
}

/// Reads `passages.jsonl` preserving order.
pub(crate) fn read_passages(dir: &Path) -> Result<Vec<Passage>, IndexError> {
    let file = fs::File::open(dir.join(PASSAGES_FILE))?;
    let mut out = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        out.push(serde_json::from_str::<Passage>(&line)?);
    }
    Ok(out)
}

/// Reads `vectors.bin`, validating the header, and returns the flat payload
/// together with `(dimension, count)`.
pub(crate) fn read_vectors(dir: &Path) -> Result<(Vec<f32>, usize, usize), IndexError> {
    let bytes = fs::read(dir.join(VECTORS_FILE))?;
    if bytes.len() < 16 {
        return Err(IndexError::Corrupt(format!(
            "vectors.bin too short for header: {} bytes",
            bytes.len()
        )));
    }

    let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if magic != VECTORS_MAGIC {
        return Err(IndexError::Corrupt(format!(
            "bad vectors.bin magic: 0x{magic:08X}"
        )));
    }
    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != VECTORS_VERSION {
        return Err(IndexError::Corrupt(format!(
            "unsupported vectors.bin version: {version}"
        )));
    }
    let dimension = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
    let count = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as usize;
    if dimension == 0 {
        return Err(IndexError::Corrupt("vector dimension is zero".into()));
    }

    let expected = 16 + count * dimension * 4;
    if bytes.len() != expected {
        return Err(IndexError::Corrupt(format!(
            "vectors.bin size mismatch: expected {expected} bytes, found {}",
            bytes.len()
        )));
    }

    let mut data = Vec::with_capacity(count * dimension);
    for chunk in bytes[16..].chunks_exact(4) {
        data.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    Ok((data, dimension, count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn passage(id: &str) -> Passage {
        Passage {
            id: id.into(),
            text: format!("知识点 {id}"),
            source: format!("page_{id}.png"),
        }
    }

    #[test]
    fn written_header_is_byte_exact() {
        let dir = TempDir::new().unwrap();
        write_index(
            dir.path(),
            "doubao-embedding-text-240715",
            Metric::InnerProduct,
            &[passage("a"), passage("b")],
            &[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
        )
        .unwrap();

        let bytes = std::fs::read(dir.path().join(VECTORS_FILE)).unwrap();
        assert_eq!(bytes.len(), 16 + 2 * 3 * 4);
        assert_eq!(&bytes[0..4], &VECTORS_MAGIC.to_le_bytes());
        assert_eq!(&bytes[4..8], &1u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &3u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &2u32.to_le_bytes());
        assert_eq!(&bytes[16..20], &1.0f32.to_le_bytes());
    }

    #[test]
    fn meta_records_dimension_and_metric() {
        let dir = TempDir::new().unwrap();
        let meta = write_index(
            dir.path(),
            "doubao-embedding-text-240715",
            Metric::Euclidean,
            &[passage("a")],
            &[vec![0.5, 0.5]],
        )
        .unwrap();
        assert_eq!(meta.dimension, 2);
        assert_eq!(meta.metric, Metric::Euclidean);

        let raw = std::fs::read_to_string(dir.path().join(META_FILE)).unwrap();
        assert!(raw.contains("\"embeddingModel\""));
        assert!(raw.contains("\"euclidean\""));

        let reread = read_meta(dir.path()).unwrap();
        assert_eq!(reread, meta);
    }

    #[test]
    fn writer_rejects_inconsistent_input() {
        let dir = TempDir::new().unwrap();

        let err = write_index(dir.path(), "m", Metric::InnerProduct, &[], &[]).unwrap_err();
        assert!(matches!(err, IndexError::Corrupt(_)));

        let err = write_index(
            dir.path(),
            "m",
            Metric::InnerProduct,
            &[passage("a"), passage("b")],
            &[vec![1.0]],
        )
        .unwrap_err();
        assert!(matches!(err, IndexError::Corrupt(_)));

        let err = write_index(
            dir.path(),
            "m",
            Metric::InnerProduct,
            &[passage("a"), passage("b")],
            &[vec![1.0, 2.0], vec![1.0]],
        )
        .unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { got: 1, want: 2 }));

        let err = write_index(
            dir.path(),
            "m",
            Metric::InnerProduct,
            &[passage("a"), passage("a")],
            &[vec![1.0], vec![2.0]],
        )
        .unwrap_err();
        assert!(matches!(err, IndexError::Corrupt(_)));
    }

    #[test]
    fn truncated_vectors_fail_to_read() {
        let dir = TempDir::new().unwrap();
        write_index(
            dir.path(),
            "m",
            Metric::InnerProduct,
            &[passage("a")],
            &[vec![1.0, 2.0]],
        )
        .unwrap();

        let path = dir.path().join(VECTORS_FILE);
        let mut bytes = std::fs::read(&path).unwrap();
        bytes.truncate(bytes.len() - 3);
        std::fs::write(&path, &bytes).unwrap();

        let err = read_vectors(dir.path()).unwrap_err();
        assert!(matches!(err, IndexError::Corrupt(_)));
    }

    #[test]
    fn corrupt_header_fails_to_read() {
        let dir = TempDir::new().unwrap();
        write_index(
            dir.path(),
            "m",
            Metric::InnerProduct,
            &[passage("a")],
            &[vec![1.0, 2.0]],
        )
        .unwrap();

        let path = dir.path().join(VECTORS_FILE);
        let good = std::fs::read(&path).unwrap();

        let mut bad_magic = good.clone();
        bad_magic[0..4].copy_from_slice(&0xDEADBEEFu32.to_le_bytes());
        std::fs::write(&path, &bad_magic).unwrap();
        let err = read_vectors(dir.path()).unwrap_err();
        assert!(matches!(err, IndexError::Corrupt(_)), "got {err}");

        let mut zero_dim = good;
        zero_dim[8..12].copy_from_slice(&0u32.to_le_bytes());
        std::fs::write(&path, &zero_dim).unwrap();
        let err = read_vectors(dir.path()).unwrap_err();
        assert!(matches!(err, IndexError::Corrupt(_)), "got {err}");
    }

    #[test]
    fn metric_scores_are_similarity_ordered() {
        let q = [1.0, 0.0];
        let near = [0.9, 0.1];
        let far = [-1.0, 0.0];

        let ip = Metric::InnerProduct;
        assert!(ip.score(&q, &near) > ip.score(&q, &far));

        let eu = Metric::Euclidean;
        assert!(eu.score(&q, &near) > eu.score(&q, &far));
        assert!(eu.score(&q, &q) == 0.0);
        assert!(eu.score(&q, &far) < 0.0);
    }

    #[test]
    fn normalize_produces_unit_vectors() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }
}
