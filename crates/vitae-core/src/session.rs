//! Session controller: builds the index once, then answers questions against it.
//!
//! States run `Uninitialized → Building → Ready`. The build runs on the first question
//! (or an explicit [SessionController::start]); a failed build drops back to
//! `Uninitialized` so the caller can retry. Once `Ready`, the session stays ready and
//! a failed question never touches the index.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::chunks::{Chunk, ChunkError, ChunkParams};
use crate::config::{Config, ConfigError};
use crate::embed::{Embedder, EmbeddingError};
use crate::generate::{AnswerGenerator, GenerationError};
use crate::index::{build_index, BuildError};
use crate::loader::LoadError;
use crate::prompt::{assemble, PromptTemplate};
use crate::providers;
use crate::store::{IndexError, VectorIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Building,
    Ready,
}

enum Phase {
    Uninitialized,
    Building,
    Ready(VectorIndex),
}

/// Generated answer plus the context it was conditioned on (nearest chunk first).
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub context: Vec<Chunk>,
}

pub struct SessionController {
    document: PathBuf,
    index_dir: PathBuf,
    reuse_existing: bool,
    params: ChunkParams,
    top_k: usize,
    template: PromptTemplate,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn AnswerGenerator>,
    phase: Phase,
}

impl SessionController {
    /// Creates a session with the providers from `config`. The credential is checked
    /// before the document is looked at.
    pub fn open(config: &Config) -> Result<Self, SessionError> {
        let (embedder, generator) = providers::connect(config)?;
        Self::new(config, embedder, generator)
    }

    /// Creates a session over explicit providers. Fails with [SessionError::NotFound]
    /// when the document is missing; nothing is embedded until the first build.
    pub fn new(
        config: &Config,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let params = ChunkParams::new(config.chunking.max_chars, config.chunking.overlap)?;
        let document = config.document.path.clone();
        if !document.exists() {
            return Err(SessionError::NotFound(document));
        }
        Ok(Self {
            document,
            index_dir: config.index.dir.clone(),
            reuse_existing: config.index.reuse_existing,
            params,
            top_k: config.retrieval.top_k,
            template: PromptTemplate::from(&config.prompt),
            embedder,
            generator,
            phase: Phase::Uninitialized,
        })
    }

    pub fn state(&self) -> SessionState {
        match self.phase {
            Phase::Uninitialized => SessionState::Uninitialized,
            Phase::Building => SessionState::Building,
            Phase::Ready(_) => SessionState::Ready,
        }
    }

    pub fn document(&self) -> &Path {
        &self.document
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    /// Number of indexed chunks, once ready.
    pub fn indexed_chunks(&self) -> Option<usize> {
        match &self.phase {
            Phase::Ready(index) => Some(index.len()),
            _ => None,
        }
    }

    /// Builds the index if that hasn't happened yet. No-op when ready.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        if matches!(self.phase, Phase::Ready(_)) {
            return Ok(());
        }
        self.phase = Phase::Building;
        match self.build().await {
            Ok(index) => {
                log::info!("session ready ({} chunks indexed)", index.len());
                self.phase = Phase::Ready(index);
                Ok(())
            }
            Err(e) => {
                log::warn!("index build failed: {}", e);
                self.phase = Phase::Uninitialized;
                Err(e)
            }
        }
    }

    async fn build(&self) -> Result<VectorIndex, SessionError> {
        if self.reuse_existing {
            match VectorIndex::open(&self.index_dir) {
                Ok(index) => {
                    log::info!("reusing persisted index at {}", self.index_dir.display());
                    return Ok(index);
                }
                Err(e) => log::info!("no reusable index ({}), rebuilding", e),
            }
        }
        log::info!("processing {}", self.document.display());
        let index = build_index(&self.document, self.params, self.embedder.as_ref(), &self.index_dir).await?;
        Ok(index)
    }

    /// The chunks that would be handed to the model for `question`, nearest first.
    pub async fn retrieve(&mut self, question: &str) -> Result<Vec<Chunk>, SessionError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(SessionError::EmptyQuestion);
        }
        self.start().await?;
        let index = self.ready_index()?;
        let query = self.embedder.embed(question).await?;
        Ok(index.retrieve(&query, self.top_k)?)
    }

    /// Answers `question` from the resume, building the index first if needed.
    pub async fn ask(&mut self, question: &str) -> Result<Answer, SessionError> {
        let context = self.retrieve(question).await?;
        let prompt = assemble(&self.template, &context, question.trim());
        log::debug!("prompt with {} context chunk(s), {} chars", context.len(), prompt.len());
        let text = self.generator.generate(&prompt).await?;
        Ok(Answer { text, context })
    }

    fn ready_index(&self) -> Result<&VectorIndex, SessionError> {
        match &self.phase {
            Phase::Ready(index) => Ok(index),
            _ => Err(SessionError::NotReady),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("resume file not found: {0}")]
    NotFound(PathBuf),
    #[error("could not load document: {0}")]
    Load(LoadError),
    #[error("chunking error: {0}")]
    Chunking(#[from] ChunkError),
    #[error("embedding service error: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("generation service error: {0}")]
    Generation(#[from] GenerationError),
    #[error("vector index error: {0}")]
    Index(#[from] IndexError),
    #[error("question is empty")]
    EmptyQuestion,
    #[error("index is not built")]
    NotReady,
}

impl SessionError {
    /// Startup errors: nothing can be answered until the setup is fixed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::Config(_) | SessionError::NotFound(_) | SessionError::Chunking(_)
        )
    }
}

impl From<LoadError> for SessionError {
    fn from(e: LoadError) -> Self {
        match e {
            LoadError::NotFound(path) => SessionError::NotFound(path),
            other => SessionError::Load(other),
        }
    }
}

impl From<BuildError> for SessionError {
    fn from(e: BuildError) -> Self {
        match e {
            BuildError::Load(e) => e.into(),
            BuildError::Embedding(e) => SessionError::Embedding(e),
            BuildError::Index(e) => SessionError::Index(e),
        }
    }
}
