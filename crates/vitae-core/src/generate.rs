//! Answer generation capability: sends an assembled prompt to a language model.

use async_trait::async_trait;

#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generate the answer text for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Rejects blank completions so callers never show an empty answer.
pub(crate) fn non_empty(answer: String) -> Result<String, GenerationError> {
    if answer.trim().is_empty() {
        return Err(GenerationError::EmptyAnswer);
    }
    Ok(answer)
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Ollama generation request failed: {0}")]
    Ollama(#[from] ollama_rs::error::OllamaError),
    #[error("generation request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("language model service returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("language model returned an empty answer")]
    EmptyAnswer,
}
