//! Ollama adapter.
//!
//! Ollama exposes an OpenAI-compatible API under `/v1`, so the adapter wraps
//! a [`ChatModel`] with Ollama-specific defaults and adds the native
//! `/api/tags` endpoint for health checks and model listing.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use aiagent_core::{
    ProviderError, ProviderOverrides, ProviderSettings, Result, Settings, TokenUsage,
};

use crate::chat_model::ChatModel;
use crate::traits::LlmProvider;

/// Key sent when no OpenAI key is configured; Ollama ignores it.
const PLACEHOLDER_API_KEY: &str = "ollama";

/// Ollama adapter over a self-hosted server.
#[derive(Debug)]
pub struct OllamaProvider {
    settings: ProviderSettings,
    model: Arc<ChatModel>,
    client: Client,
}

impl OllamaProvider {
    pub const ID: &'static str = "ollama";

    /// Provider settings derived from the process settings.
    pub fn defaults(settings: &Settings) -> ProviderSettings {
        let api_key = settings.openai_api_key.expose_secret();
        let api_key = if api_key.is_empty() {
            PLACEHOLDER_API_KEY
        } else {
            api_key
        };

        ProviderSettings {
            provider_name: Self::ID.to_string(),
            model_name: settings.ollama_model_name.clone(),
            base_url: settings.ollama_base_url.clone(),
            api_key: SecretString::from(api_key.to_string()),
            temperature: 0.5,
            max_retries: 3,
        }
    }

    /// Build the adapter from the process settings and per-call overrides.
    pub fn new(settings: &Settings, overrides: ProviderOverrides) -> Result<Self> {
        Self::from_provider_settings(Self::defaults(settings).with_overrides(overrides))
    }

    /// Build the adapter from fully resolved provider settings.
    ///
    /// `base_url` is the server root; `/v1` is appended when missing.
    pub fn from_provider_settings(mut settings: ProviderSettings) -> Result<Self> {
        crate::require_feature(Self::ID, "ollama", cfg!(feature = "ollama"))?;

        settings.base_url = openai_base_url(&settings.base_url);
        let model = ChatModel::new(&settings);
        info!(
            "OllamaLLM initialized with model: {} at {}",
            settings.model_name,
            server_root(&settings.base_url)
        );

        Ok(Self {
            settings,
            model: Arc::new(model),
            client: Client::new(),
        })
    }

    /// Check whether the server answers.
    pub async fn is_running(&self) -> bool {
        match self.client.get(self.tags_url()).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!("Ollama not reachable: {}", e);
                false
            }
        }
    }

    /// List the models pulled on the server.
    pub async fn list_models(&self) -> Result<Vec<OllamaModel>> {
        let response = self
            .client
            .get(self.tags_url())
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError {
                provider: Self::ID.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::api_error(Self::ID, status.as_u16(), text).into());
        }

        let tags: OllamaTags = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse {
                provider: Self::ID.to_string(),
                message: e.to_string(),
            })?;
        Ok(tags.models)
    }

    fn tags_url(&self) -> String {
        format!("{}/api/tags", server_root(&self.settings.base_url))
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        "Ollama"
    }

    fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    fn get_model(&self) -> Arc<ChatModel> {
        Arc::clone(&self.model)
    }

    /// LLM-result style metadata: usage lives under `llm_output.token_usage`.
    fn get_token_usage(&self, metadata: &Value) -> TokenUsage {
        TokenUsage::from_metadata_path(metadata, &["llm_output", "token_usage"])
    }
}

fn openai_base_url(url: &str) -> String {
    let url = url.trim_end_matches('/');
    if url.ends_with("/v1") {
        url.to_string()
    } else {
        format!("{}/v1", url)
    }
}

fn server_root(url: &str) -> &str {
    url.trim_end_matches('/').trim_end_matches("/v1")
}

#[derive(Debug, Deserialize)]
struct OllamaTags {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

/// A model installed on an Ollama server.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaModel {
    pub name: String,
    #[serde(default)]
    pub modified_at: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub details: Option<OllamaModelDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaModelDetails {
    pub family: Option<String>,
    pub parameter_size: Option<String>,
    pub quantization_level: Option<String>,
}

#[cfg(all(test, feature = "ollama"))]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider() -> OllamaProvider {
        OllamaProvider::new(&Settings::with_secret("s"), ProviderOverrides::none()).unwrap()
    }

    #[test]
    fn test_defaults() {
        let provider = provider();
        let model = provider.get_model();

        assert_eq!(provider.id(), "ollama");
        assert_eq!(model.model_name(), "qwq:32b");
        assert_eq!(model.temperature(), 0.5);
        assert_eq!(model.retry_policy().max_retries, 3);
        assert_eq!(model.base_url(), "http://localhost:11434/v1");
        assert_eq!(provider.settings().api_key.expose_secret(), "ollama");
        assert!(!model.folds_system_messages());
    }

    #[test]
    fn test_configured_openai_key_is_used() {
        let mut settings = Settings::with_secret("s");
        settings.openai_api_key = SecretString::from("sk-local".to_string());

        let provider = OllamaProvider::new(&settings, ProviderOverrides::none()).unwrap();
        assert_eq!(provider.settings().api_key.expose_secret(), "sk-local");
    }

    #[test]
    fn test_base_url_normalization() {
        assert_eq!(openai_base_url("http://h:11434"), "http://h:11434/v1");
        assert_eq!(openai_base_url("http://h:11434/"), "http://h:11434/v1");
        assert_eq!(openai_base_url("http://h:11434/v1"), "http://h:11434/v1");
        assert_eq!(server_root("http://h:11434/v1"), "http://h:11434");
    }

    #[test]
    fn test_get_model_is_idempotent() {
        let provider = provider();
        assert!(Arc::ptr_eq(&provider.get_model(), &provider.get_model()));
    }

    #[test]
    fn test_token_usage_reads_llm_output() {
        let provider = provider();
        let usage = provider.get_token_usage(&json!({
            "llm_output": {"token_usage": {"prompt_tokens": 2, "completion_tokens": 3, "total_tokens": 5}}
        }));
        assert_eq!(usage, TokenUsage::new(2, 3, 5));

        assert!(provider.get_token_usage(&json!({})).is_empty());
        assert!(provider
            .get_token_usage(&json!({"token_usage": {"total_tokens": 9}}))
            .is_empty());
    }
}

#[cfg(all(test, not(feature = "ollama")))]
mod disabled_tests {
    use super::*;
    use crate::ProviderRegistry;
    use aiagent_core::Error;

    fn assert_missing(err: Error) {
        match err {
            Error::DependencyMissing { provider, feature } => {
                assert_eq!(provider, "ollama");
                assert_eq!(feature, "ollama");
            }
            other => panic!("expected DependencyMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_new_requires_feature() {
        let err = OllamaProvider::new(&Settings::with_secret("s"), ProviderOverrides::none())
            .err()
            .unwrap();
        assert_missing(err);
    }

    #[test]
    fn test_registry_keeps_name_but_fails_to_resolve() {
        let registry = ProviderRegistry::builtin();
        assert!(registry.contains("ollama"));

        let err = registry
            .resolve(&Settings::with_secret("s"), "ollama", ProviderOverrides::none())
            .err()
            .unwrap();
        assert!(err.to_string().contains("'ollama' feature"));
        assert_missing(err);
    }
}
