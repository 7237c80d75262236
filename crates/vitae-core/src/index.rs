//! Index pipeline: load → chunk → embed → store. Builds the persisted vector index.

use std::path::Path;

use crate::chunks::{chunk_segments, ChunkParams};
use crate::embed::{Embedder, EmbeddingError};
use crate::loader::{load_document, LoadError};
use crate::store::{IndexError, VectorIndex};

/// Runs the full pipeline for `document` and writes the index to `index_dir`,
/// replacing any index already there. All chunks are embedded in one batch.
pub async fn build_index(
    document: &Path,
    params: ChunkParams,
    embedder: &dyn Embedder,
    index_dir: &Path,
) -> Result<VectorIndex, BuildError> {
    let segments = load_document(document)?;
    let chunks = chunk_segments(&segments, params);
    log::info!(
        "split {} page(s) of {} into {} chunk(s)",
        segments.len(),
        document.display(),
        chunks.len()
    );

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings = embedder.embed_batch(&texts).await?;
    if embeddings.len() != chunks.len() {
        return Err(EmbeddingError::CountMismatch {
            expected: chunks.len(),
            actual: embeddings.len(),
        }
        .into());
    }

    let index = VectorIndex::build(index_dir, chunks.into_iter().zip(embeddings).collect())?;
    Ok(index)
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("load error: {0}")]
    Load(#[from] LoadError),
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("index error: {0}")]
    Index(#[from] IndexError),
}
