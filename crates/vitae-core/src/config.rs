//! Persisted config (document path, index location, provider, prompt) as TOML.
//!
//! Every field has a default so an empty or missing `config.toml` is valid.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app_data;

pub const CONFIG_FILENAME: &str = "config.toml";

/// Instructions sent ahead of the retrieved context. `{subject}` is filled from
/// [PromptConfig::variables].
pub const DEFAULT_INSTRUCTIONS: &str = "\
Reader Skill: Leverage your adeptness and summarizing skills to accurately respond to queries regarding {subject}'s resume.
Individual Identity: Keep in mind that the resume belongs to an individual named {subject}.
Conciseness and Relevance: Ensure your responses are concise, relevant, and directly address the query.
Precision: Provide precise and detailed answers, focusing solely on the information presented in the resume.
Missing Information: If certain details are absent in the resume, acknowledge it and provide a brief summary of {subject}.
Positivity: Maintain a positive tone in your responses, aiming to enhance opportunities for {subject}.
Exclusion of Non-Resume Information: Do not include any information that is not available on the resume.
Clarity: Responses should be clear and easy to understand.
Accuracy: Ensure responses accurately reflect the content of the resume.
Engagement: Provide engaging and informative responses.
Respectful Language: Use respectful and professional language throughout.
Singular Reference: Refer to {subject} as one individual, by name or with singular pronouns, never with plural pronouns such as \"they\" or \"their\".
Markdown Formatting: Present your responses in clear markdown format for easy readability and use sub-headings and lists wherever possible.";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub document: DocumentConfig,
    pub index: IndexConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub provider: ProviderConfig,
    pub prompt: PromptConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// The resume to answer questions about (`.pdf`, `.txt` or `.md`).
    pub path: PathBuf,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("resume.pdf"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Storage root of the persisted vector index.
    pub dir: PathBuf,
    /// Open an already persisted index instead of rebuilding it on first use.
    pub reuse_existing: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: app_data::default_index_dir(),
            reuse_existing: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: crate::chunks::DEFAULT_MAX_CHARS,
            overlap: crate::chunks::DEFAULT_OVERLAP,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks handed to the model as context.
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Ollama,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// Overrides the provider's default embedding model.
    pub embed_model: Option<String>,
    /// Overrides the provider's default chat/generation model.
    pub chat_model: Option<String>,
    /// Overrides the provider's default base URL.
    pub base_url: Option<String>,
    /// Environment variable holding the API key (OpenAI only).
    pub api_key_env: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::OpenAi,
            embed_model: None,
            chat_model: None,
            base_url: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.0,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub instructions: String,
    /// Values for `{name}` placeholders in `instructions`.
    pub variables: BTreeMap<String, String>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        let mut variables = BTreeMap::new();
        variables.insert("subject".to_string(), "the candidate".to_string());
        Self {
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            variables,
        }
    }
}

impl Config {
    /// Reads the API credential from the environment variable named in the provider section.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        let var = &self.provider.api_key_env;
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(ConfigError::MissingCredential(var.clone())),
        }
    }

    /// Checks settings that would otherwise fail deep inside the pipeline.
    /// Chunk sizes are checked by [crate::chunks::ChunkParams::new].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::InvalidTopK);
        }
        Ok(())
    }
}

/// Load config from `path`. Returns default config if the file is missing.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let s = std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
    toml::from_str(&s).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
}

/// Load config from the app data directory, or defaults if there is none.
pub fn load_default_config() -> Result<Config, ConfigError> {
    match default_config_path() {
        Some(path) => load_config(&path),
        None => Ok(Config::default()),
    }
}

/// `config.toml` inside the app data directory.
pub fn default_config_path() -> Option<PathBuf> {
    app_data::app_data_dir().map(|d| d.join(CONFIG_FILENAME))
}

/// Save config to `path`.
pub fn save_config(config: &Config, path: &Path) -> Result<(), ConfigError> {
    let s = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;
    std::fs::write(path, s).map_err(ConfigError::Write)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("API key not found: set the {0} environment variable")]
    MissingCredential(String),
    #[error("failed to read config {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("invalid config {0}: {1}")]
    Parse(PathBuf, toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("failed to write config: {0}")]
    Write(std::io::Error),
    #[error("retrieval top_k must be at least 1")]
    InvalidTopK,
    #[error("invalid provider URL: {0}")]
    InvalidUrl(String),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.chunking.max_chars, 1000);
        assert_eq!(config.chunking.overlap, 100);
        assert_eq!(config.provider.temperature, 0.0);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            "[document]\npath = \"cv.txt\"\n\n[provider]\nkind = \"ollama\"\n\n[prompt.variables]\nsubject = \"Ada\"\n",
        )
        .unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.document.path, PathBuf::from("cv.txt"));
        assert_eq!(config.provider.kind, ProviderKind::Ollama);
        assert_eq!(config.prompt.variables.get("subject").map(String::as_str), Some("Ada"));
        assert_eq!(config.retrieval.top_k, 4);
    }

    #[test]
    fn default_instructions_keep_every_directive() {
        for directive in ["Reader Skill:", "Missing Information:", "Singular Reference:", "Markdown Formatting:"] {
            assert!(DEFAULT_INSTRUCTIONS.contains(directive), "{directive}");
        }
        assert_eq!(DEFAULT_INSTRUCTIONS.lines().count(), 13);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        let mut config = Config::default();
        config.retrieval.top_k = 7;
        save_config(&config, &path).unwrap();
        assert_eq!(load_config(&path).unwrap().retrieval.top_k, 7);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[chunking\nmax_chars = ").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Parse(..))));
    }

    #[test]
    fn validate_rejects_zero_top_k() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());
        config.retrieval.top_k = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTopK)));
    }

    #[test]
    fn api_key_missing_is_reported_by_name() {
        let mut config = Config::default();
        config.provider.api_key_env = "VITAE_TEST_SURELY_UNSET_KEY".to_string();
        match config.api_key() {
            Err(ConfigError::MissingCredential(var)) => assert_eq!(var, "VITAE_TEST_SURELY_UNSET_KEY"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
