//! Google Gemini adapter.
//!
//! Gemini is reached through Google's OpenAI-compatible endpoint. It does not
//! accept system messages from older clients, so instructions are folded into
//! the first user message.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use aiagent_core::config::clone_secret;
use aiagent_core::{ProviderOverrides, ProviderSettings, Result, Settings, TokenUsage};

use crate::chat_model::ChatModel;
use crate::traits::LlmProvider;

/// OpenAI-compatible Gemini endpoint.
pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Default Gemini model.
pub const DEFAULT_MODEL: &str = "gemini-pro";

/// Gemini adapter over a managed endpoint.
#[derive(Debug)]
pub struct GeminiProvider {
    settings: ProviderSettings,
    model: Arc<ChatModel>,
}

impl GeminiProvider {
    pub const ID: &'static str = "gemini";

    /// Provider settings derived from the process settings.
    pub fn defaults(settings: &Settings) -> ProviderSettings {
        ProviderSettings {
            provider_name: Self::ID.to_string(),
            model_name: DEFAULT_MODEL.to_string(),
            base_url: GEMINI_API_URL.to_string(),
            api_key: clone_secret(&settings.gemini_api_key),
            temperature: 0.7,
            max_retries: 2,
        }
    }

    /// Build the adapter from the process settings and per-call overrides.
    pub fn new(settings: &Settings, overrides: ProviderOverrides) -> Result<Self> {
        Self::from_provider_settings(Self::defaults(settings).with_overrides(overrides))
    }

    /// Build the adapter from fully resolved provider settings.
    pub fn from_provider_settings(settings: ProviderSettings) -> Result<Self> {
        crate::require_feature(Self::ID, "gemini", cfg!(feature = "gemini"))?;

        let model = ChatModel::new(&settings).with_system_folding(true);
        info!("GeminiLLM initialized with model: {}", settings.model_name);

        Ok(Self {
            settings,
            model: Arc::new(model),
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        "Google Gemini"
    }

    fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    fn get_model(&self) -> Arc<ChatModel> {
        Arc::clone(&self.model)
    }

    /// Chat-model style metadata: `token_usage` at the top level.
    fn get_token_usage(&self, metadata: &Value) -> TokenUsage {
        TokenUsage::from_metadata_path(metadata, &["token_usage"])
    }
}


#[cfg(all(test, not(feature = "gemini")))]
mod disabled_tests {
    use super::*;
    use crate::ProviderRegistry;
    use aiagent_core::Error;

    fn assert_missing(err: Error) {
        match err {
            Error::DependencyMissing { provider, feature } => {
                assert_eq!(provider, "gemini");
                assert_eq!(feature, "gemini");
            }
            other => panic!("expected DependencyMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_new_requires_feature() {
        let err = GeminiProvider::new(&Settings::with_secret("s"), ProviderOverrides::none())
            .err()
            .unwrap();
        assert_missing(err);
    }

    #[test]
    fn test_registry_keeps_name_but_fails_to_resolve() {
        let registry = ProviderRegistry::builtin();
        assert!(registry.contains("gemini"));

        let err = registry
            .resolve(&Settings::with_secret("s"), "gemini", ProviderOverrides::none())
            .err()
            .unwrap();
        assert!(err.to_string().contains("'gemini' feature"));
        assert_missing(err);
    }
}
