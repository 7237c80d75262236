//! Embedding capability: turns chunk text and questions into vectors.
//!
//! Providers implement [Embedder]; the session only sees the trait. Each call is a
//! single attempt, failures are returned to the caller as-is.

use async_trait::async_trait;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single string.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed many strings. Returns one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Checks a provider answered once per input.
pub(crate) fn expect_count(
    embeddings: Vec<Vec<f32>>,
    inputs: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if embeddings.len() != inputs {
        return Err(EmbeddingError::CountMismatch {
            expected: inputs,
            actual: embeddings.len(),
        });
    }
    Ok(embeddings)
}

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Ollama embedding request failed: {0}")]
    Ollama(#[from] ollama_rs::error::OllamaError),
    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("embedding service returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("embedding service returned {actual} vectors for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },
}
