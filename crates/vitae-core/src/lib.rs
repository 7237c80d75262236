//! All backend logic independent of how the app is run.
//!
//! Answers questions about one resume with retrieval-augmented generation:
//! load → chunk → embed → index once, then retrieve → prompt → generate per question.
//! Vitae stores only config and the persisted index in its own app data directory (see [app_data]).

pub mod app_data;
pub mod chunks;
pub mod config;
pub mod embed;
pub mod generate;
pub mod index;
pub mod loader;
pub mod ollama;
pub mod openai;
pub mod prompt;
pub mod providers;
pub mod session;
pub mod store;

pub use app_data::app_data_dir;
pub use chunks::{chunk_segments, Chunk, ChunkParams, DEFAULT_MAX_CHARS, DEFAULT_OVERLAP};
pub use config::{load_config, load_default_config, save_config, Config, ConfigError};
pub use embed::{Embedder, EmbeddingError};
pub use generate::{AnswerGenerator, GenerationError};
pub use index::{build_index, BuildError};
pub use loader::{load_document, LoadError, Segment};
pub use prompt::{assemble, PromptTemplate};
pub use providers::connect;
pub use session::{Answer, SessionController, SessionError, SessionState};
pub use store::{IndexError, VectorIndex};

/// Returns a short status string. Used to verify the backend is wired up.
pub fn status() -> &'static str {
    "vitae-core ready"
}
