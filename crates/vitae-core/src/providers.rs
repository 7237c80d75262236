//! Builds the configured embedding and answer providers.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, ConfigError, ProviderKind};
use crate::embed::Embedder;
use crate::generate::AnswerGenerator;
use crate::ollama::{self, OllamaClient};
use crate::openai::{self, OpenAiClient};

/// Resolves credentials and builds both providers. Reads the environment, never the document.
pub fn connect(config: &Config) -> Result<(Arc<dyn Embedder>, Arc<dyn AnswerGenerator>), ConfigError> {
    let p = &config.provider;
    match p.kind {
        ProviderKind::OpenAi => {
            let api_key = config.api_key()?;
            let base_url = p.base_url.as_deref().unwrap_or(openai::DEFAULT_BASE_URL);
            let mut client = OpenAiClient::new(&api_key, base_url, Duration::from_secs(p.timeout_secs))?
                .with_temperature(p.temperature);
            if let Some(model) = &p.embed_model {
                client = client.with_embed_model(model);
            }
            if let Some(model) = &p.chat_model {
                client = client.with_chat_model(model);
            }
            log::debug!("using OpenAI provider at {}", base_url);
            Ok(share(client))
        }
        ProviderKind::Ollama => {
            let base_url = p.base_url.as_deref().unwrap_or(ollama::DEFAULT_BASE_URL);
            let mut client = OllamaClient::from_url(base_url)
                .map_err(|e| ConfigError::InvalidUrl(format!("{base_url}: {e}")))?
                .with_temperature(p.temperature);
            if let Some(model) = &p.embed_model {
                client = client.with_embed_model(model);
            }
            if let Some(model) = &p.chat_model {
                client = client.with_chat_model(model);
            }
            log::debug!("using Ollama provider at {}", base_url);
            Ok(share(client))
        }
    }
}

fn share<C>(client: C) -> (Arc<dyn Embedder>, Arc<dyn AnswerGenerator>)
where
    C: Embedder + AnswerGenerator + 'static,
{
    let client = Arc::new(client);
    let embedder: Arc<dyn Embedder> = client.clone();
    let generator: Arc<dyn AnswerGenerator> = client;
    (embedder, generator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_without_key_is_config_error() {
        let mut config = Config::default();
        config.provider.api_key_env = "VITAE_TEST_NO_SUCH_KEY".to_string();
        assert!(matches!(connect(&config), Err(ConfigError::MissingCredential(_))));
    }

    #[test]
    fn ollama_needs_no_key() {
        let mut config = Config::default();
        config.provider.kind = ProviderKind::Ollama;
        config.provider.api_key_env = "VITAE_TEST_NO_SUCH_KEY".to_string();
        assert!(connect(&config).is_ok());
    }

    #[test]
    fn ollama_bad_url_is_config_error() {
        let mut config = Config::default();
        config.provider.kind = ProviderKind::Ollama;
        config.provider.base_url = Some("::::".to_string());
        assert!(matches!(connect(&config), Err(ConfigError::InvalidUrl(_))));
    }
}
