//! Ollama client for embeddings and answers. Wraps ollama-rs behind [Embedder] and [AnswerGenerator].

use async_trait::async_trait;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::embeddings::request::{EmbeddingsInput, GenerateEmbeddingsRequest};
use ollama_rs::models::ModelOptions;
use ollama_rs::Ollama;

use crate::embed::{expect_count, Embedder, EmbeddingError};
use crate::generate::{non_empty, AnswerGenerator, GenerationError};

pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_CHAT_MODEL: &str = "llama3.2";
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Thin wrapper around Ollama for embedding and completion.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    inner: Ollama,
    embed_model: String,
    chat_model: String,
    temperature: f32,
}

impl OllamaClient {
    /// Create from URL string, e.g. http://localhost:11434.
    pub fn from_url(url: &str) -> Result<Self, url::ParseError> {
        let inner = Ollama::try_new(url)?;
        Ok(Self {
            inner,
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: 0.0,
        })
    }

    /// Set the embedding model (e.g. `nomic-embed-text`, `all-minilm`).
    pub fn with_embed_model(mut self, model: impl Into<String>) -> Self {
        self.embed_model = model.into();
        self
    }

    /// Set the model used to answer questions.
    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl Embedder for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let req = GenerateEmbeddingsRequest::new(
            self.embed_model.clone(),
            EmbeddingsInput::Single(text.to_string()),
        );
        let res = self.inner.generate_embeddings(req).await?;
        let mut embeddings = expect_count(res.embeddings, 1)?;
        Ok(embeddings.remove(0))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let req = GenerateEmbeddingsRequest::new(
            self.embed_model.clone(),
            EmbeddingsInput::Multiple(texts.to_vec()),
        );
        let res = self.inner.generate_embeddings(req).await?;
        expect_count(res.embeddings, texts.len())
    }
}

#[async_trait]
impl AnswerGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let req = GenerationRequest::new(self.chat_model.clone(), prompt.to_string())
            .options(ModelOptions::default().temperature(self.temperature));
        let res = self.inner.generate(req).await?;
        non_empty(res.response)
    }
}
