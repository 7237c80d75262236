//! Vector index for chunk embeddings, persisted as JSON under a storage directory.
//!
//! Built once from scratch (overwriting whatever was there) and read-only afterwards.
//! Search is brute-force cosine distance, which is plenty for a single resume.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::chunks::Chunk;

/// File inside the storage directory holding the index.
pub const INDEX_FILENAME: &str = "index.json";

const FORMAT_VERSION: u32 = 1;

/// A chunk with its embedding, stored for similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,
    /// Normalized embedding vector (unit length, so cosine similarity is a dot product).
    embedding: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct PersistedIndex {
    version: u32,
    dimension: usize,
    entries: Vec<IndexEntry>,
}

/// Persistent vector index. Entries keep insertion order; every embedding has the same dimension.
#[derive(Debug)]
pub struct VectorIndex {
    dir: PathBuf,
    dimension: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Builds an index from `(chunk, embedding)` pairs and writes it to `dir`,
    /// replacing any index previously persisted there.
    pub fn build(dir: &Path, pairs: Vec<(Chunk, Vec<f32>)>) -> Result<Self, IndexError> {
        let dimension = pairs.first().map_or(0, |(_, e)| e.len());
        let mut entries = Vec::with_capacity(pairs.len());
        for (chunk, embedding) in pairs {
            if embedding.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    actual: embedding.len(),
                });
            }
            if dimension == 0 {
                return Err(IndexError::EmptyEmbedding);
            }
            if !is_finite(&embedding) {
                return Err(IndexError::NonFinite(format!("chunk {}", chunk.index)));
            }
            entries.push(IndexEntry {
                chunk,
                embedding: normalize(&embedding),
            });
        }
        let index = Self {
            dir: dir.to_path_buf(),
            dimension,
            entries,
        };
        index.persist()?;
        log::info!(
            "built vector index with {} entries (dimension {}) at {}",
            index.entries.len(),
            index.dimension,
            dir.display()
        );
        Ok(index)
    }

    /// Re-opens an index persisted by [VectorIndex::build] without re-embedding anything.
    pub fn open(dir: &Path) -> Result<Self, IndexError> {
        let path = dir.join(INDEX_FILENAME);
        if !path.is_file() {
            return Err(IndexError::Missing(dir.to_path_buf()));
        }
        let s = std::fs::read_to_string(&path)?;
        let persisted: PersistedIndex = serde_json::from_str(&s)?;
        if persisted.version != FORMAT_VERSION {
            return Err(IndexError::UnsupportedVersion(persisted.version));
        }
        if let Some(bad) = persisted.entries.iter().find(|e| e.embedding.len() != persisted.dimension) {
            return Err(IndexError::DimensionMismatch {
                expected: persisted.dimension,
                actual: bad.embedding.len(),
            });
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            dimension: persisted.dimension,
            entries: persisted.entries,
        })
    }

    fn persist(&self) -> Result<(), IndexError> {
        std::fs::create_dir_all(&self.dir)?;
        let persisted = PersistedIndex {
            version: FORMAT_VERSION,
            dimension: self.dimension,
            entries: self.entries.clone(),
        };
        let bytes = serde_json::to_vec(&persisted)?;
        // Write then rename so a crash never leaves a half-written index behind.
        let tmp = self.dir.join(format!("{INDEX_FILENAME}.tmp"));
        let written = std::fs::write(&tmp, bytes).and_then(|()| std::fs::rename(&tmp, self.dir.join(INDEX_FILENAME)));
        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    /// Chunks nearest to the query embedding, nearest first, at most `k` of them.
    pub fn retrieve(&self, query_embedding: &[f32], k: usize) -> Result<Vec<Chunk>, IndexError> {
        Ok(self
            .search(query_embedding, k)?
            .into_iter()
            .map(|(chunk, _)| chunk)
            .collect())
    }

    /// Like [VectorIndex::retrieve] but with cosine distances (0 = same direction, 2 = opposite).
    /// Equal distances keep insertion order.
    pub fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<(Chunk, f32)>, IndexError> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query_embedding.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query_embedding.len(),
            });
        }
        if !is_finite(query_embedding) {
            return Err(IndexError::NonFinite("query".to_string()));
        }
        let q_norm = normalize(query_embedding);
        let mut scored: Vec<(&IndexEntry, f32)> = self
            .entries
            .iter()
            .map(|e| (e, 1.0 - dot(&q_norm, &e.embedding)))
            .collect();
        // sort_by is stable, which gives the insertion-order tie break.
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        Ok(scored
            .into_iter()
            .take(k)
            .map(|(e, d)| (e.chunk.clone(), d))
            .collect())
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Embedding dimension (0 for an empty index).
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Storage root of this index.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn is_finite(v: &[f32]) -> bool {
    v.iter().all(|x| x.is_finite())
}

fn normalize(v: &[f32]) -> Vec<f32> {
    // Scale by the largest component first so squaring can't overflow.
    let scale = v.iter().fold(0.0f32, |m, x| m.max(x.abs()));
    if scale <= 0.0 {
        return v.to_vec();
    }
    let scaled: Vec<f32> = v.iter().map(|x| x / scale).collect();
    let norm = scaled.iter().map(|x| x * x).sum::<f32>().sqrt();
    scaled.iter().map(|x| x / norm).collect()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("index I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("index serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("embedding vectors must not be empty")]
    EmptyEmbedding,
    #[error("embedding for {0} contains NaN or infinite values")]
    NonFinite(String),
    #[error("no persisted index in {0}")]
    Missing(PathBuf),
    #[error("unsupported index format version {0}")]
    UnsupportedVersion(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(i: usize, text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            page_start: 1,
            page_end: 1,
            start: i * 10,
            end: i * 10 + text.chars().count(),
            index: i,
        }
    }

    fn sample(dir: &Path) -> VectorIndex {
        VectorIndex::build(
            dir,
            vec![
                (chunk(0, "rust"), vec![1.0, 0.0, 0.0]),
                (chunk(1, "python"), vec![0.0, 1.0, 0.0]),
                (chunk(2, "rust and python"), vec![1.0, 1.0, 0.0]),
                (chunk(3, "cooking"), vec![0.0, 0.0, 1.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn retrieve_orders_nearest_first() {
        let dir = tempfile::tempdir().unwrap();
        let index = sample(dir.path());
        let hits = index.search(&[0.9, 0.1, 0.0], 4).unwrap();
        let texts: Vec<_> = hits.iter().map(|(c, _)| c.text.as_str()).collect();
        assert_eq!(texts, vec!["rust", "rust and python", "python", "cooking"]);
        assert!(hits.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn retrieve_returns_min_k_len() {
        let dir = tempfile::tempdir().unwrap();
        let index = sample(dir.path());
        assert_eq!(index.retrieve(&[1.0, 0.0, 0.0], 2).unwrap().len(), 2);
        assert_eq!(index.retrieve(&[1.0, 0.0, 0.0], 10).unwrap().len(), 4);
        assert!(index.retrieve(&[1.0, 0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn ties_keep_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::build(
            dir.path(),
            vec![
                (chunk(0, "first"), vec![0.0, 1.0]),
                (chunk(1, "second"), vec![0.0, 2.0]),
                (chunk(2, "third"), vec![0.0, 3.0]),
            ],
        )
        .unwrap();
        let texts: Vec<_> = index
            .retrieve(&[0.0, 1.0], 3)
            .unwrap()
            .into_iter()
            .map(|c| c.text)
            .collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn build_persists_and_open_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let built = sample(dir.path());
        assert!(dir.path().join(INDEX_FILENAME).is_file());
        let reopened = VectorIndex::open(dir.path()).unwrap();
        assert_eq!(reopened.len(), built.len());
        assert_eq!(reopened.dimension(), 3);
        assert_eq!(
            reopened.retrieve(&[0.0, 0.0, 1.0], 1).unwrap()[0].text,
            "cooking"
        );
    }

    #[test]
    fn build_overwrites_previous_index() {
        let dir = tempfile::tempdir().unwrap();
        sample(dir.path());
        VectorIndex::build(dir.path(), vec![(chunk(0, "only"), vec![1.0, 0.0])]).unwrap();
        let reopened = VectorIndex::open(dir.path()).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.dimension(), 2);
    }

    #[test]
    fn mixed_dimensions_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = VectorIndex::build(
            dir.path(),
            vec![(chunk(0, "a"), vec![1.0, 0.0]), (chunk(1, "b"), vec![1.0])],
        )
        .unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn query_dimension_checked() {
        let dir = tempfile::tempdir().unwrap();
        let index = sample(dir.path());
        assert!(matches!(
            index.retrieve(&[1.0, 0.0], 1),
            Err(IndexError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn non_finite_embeddings_rejected_at_build() {
        let dir = tempfile::tempdir().unwrap();
        let pairs: Vec<_> = (0..64)
            .map(|i| {
                let e = if i % 7 == 0 { vec![f32::NAN, 1.0] } else { vec![1.0, i as f32] };
                (chunk(i, "x"), e)
            })
            .collect();
        let err = VectorIndex::build(dir.path(), pairs).unwrap_err();
        assert!(matches!(err, IndexError::NonFinite(_)));
        let err = VectorIndex::build(dir.path(), vec![(chunk(0, "x"), vec![f32::INFINITY, 0.0])]).unwrap_err();
        assert!(matches!(err, IndexError::NonFinite(_)));
        assert!(!dir.path().join(INDEX_FILENAME).exists());
    }

    #[test]
    fn non_finite_query_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let index = sample(dir.path());
        assert!(matches!(
            index.search(&[f32::NAN, 1.0, 0.0], 4),
            Err(IndexError::NonFinite(_))
        ));
    }

    #[test]
    fn huge_components_still_sort() {
        let dir = tempfile::tempdir().unwrap();
        let pairs: Vec<_> = (0..64)
            .map(|i| (chunk(i, "x"), vec![f32::MAX / (i % 5 + 1) as f32, f32::MAX]))
            .collect();
        let index = VectorIndex::build(dir.path(), pairs).unwrap();
        let hits = index.search(&[1.0, 0.0], 64).unwrap();
        assert_eq!(hits.len(), 64);
        assert!(hits.iter().all(|(_, d)| d.is_finite()));
        assert!(hits.windows(2).all(|w| w[0].1 <= w[1].1));
        // [MAX, MAX] points closest to the x axis.
        assert_eq!(hits[0].0.index, 0);
    }

    #[test]
    fn failed_persist_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory where index.json should go makes the rename fail.
        std::fs::create_dir_all(dir.path().join(INDEX_FILENAME).join("occupied")).unwrap();
        let err = VectorIndex::build(dir.path(), vec![(chunk(0, "a"), vec![1.0, 0.0])]).unwrap_err();
        assert!(matches!(err, IndexError::Io(_)));
        assert!(!dir.path().join(format!("{INDEX_FILENAME}.tmp")).exists());
    }

    #[test]
    fn open_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            VectorIndex::open(&dir.path().join("nothing")),
            Err(IndexError::Missing(_))
        ));
    }

    #[test]
    fn empty_index_retrieves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::build(dir.path(), Vec::new()).unwrap();
        assert!(index.is_empty());
        assert!(index.retrieve(&[1.0], 3).unwrap().is_empty());
    }
}
