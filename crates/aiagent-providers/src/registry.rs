//! Provider registry: maps provider names to adapter constructors.

use std::collections::BTreeMap;

use tracing::info;

use aiagent_core::{Error, ProviderOverrides, Result, Settings};

use crate::gemini::GeminiProvider;
use crate::ollama::OllamaProvider;
use crate::traits::LlmProvider;

/// Builds one adapter from the process settings and per-call overrides.
pub type ProviderCtor = fn(&Settings, ProviderOverrides) -> Result<Box<dyn LlmProvider>>;

/// Table of known providers.
#[derive(Clone)]
pub struct ProviderRegistry {
    ctors: BTreeMap<String, ProviderCtor>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            ctors: BTreeMap::new(),
        }
    }

    /// Registry with every built-in adapter.
    ///
    /// Adapters compiled out of this build stay listed; resolving them fails
    /// with [`Error::DependencyMissing`].
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(OllamaProvider::ID, build_ollama);
        registry.register(GeminiProvider::ID, build_gemini);
        registry
    }

    /// Register (or replace) a constructor.
    pub fn register(&mut self, name: impl Into<String>, ctor: ProviderCtor) {
        self.ctors.insert(name.into(), ctor);
    }

    /// Instantiate the adapter registered under `name`.
    pub fn resolve(
        &self,
        settings: &Settings,
        name: &str,
        overrides: ProviderOverrides,
    ) -> Result<Box<dyn LlmProvider>> {
        let Some(ctor) = self.ctors.get(name) else {
            return Err(Error::unknown_provider(name, &self.names()));
        };

        info!("Using LLM provider: {}", name);
        ctor(settings, overrides)
    }

    /// Instantiate the provider named by `DEFAULT_LLM_PROVIDER`.
    pub fn resolve_default(
        &self,
        settings: &Settings,
        overrides: ProviderOverrides,
    ) -> Result<Box<dyn LlmProvider>> {
        self.resolve(settings, &settings.default_llm_provider, overrides)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.ctors.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ctors.contains_key(name)
    }
}

fn build_ollama(settings: &Settings, overrides: ProviderOverrides) -> Result<Box<dyn LlmProvider>> {
    Ok(Box::new(OllamaProvider::new(settings, overrides)?))
}

fn build_gemini(settings: &Settings, overrides: ProviderOverrides) -> Result<Box<dyn LlmProvider>> {
    Ok(Box::new(GeminiProvider::new(settings, overrides)?))
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}
