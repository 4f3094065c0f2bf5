//! # aiagent-providers
//!
//! Remote chat models for aiagent.
//!
//! This crate provides:
//! - [`ChatModel`], an OpenAI-compatible chat-completions client with
//!   streaming and retry
//! - The [`LlmProvider`] adapter trait
//! - Adapters for Gemini and Ollama, each behind a cargo feature
//! - [`ProviderRegistry`] for resolving adapters by name

pub mod chat_model;
pub mod gemini;
pub mod ollama;
pub mod registry;
pub mod retry;
pub mod sse;
pub mod traits;

use tracing::error;

use aiagent_core::{Error, Result};

pub use chat_model::{
    ChatChunk, ChatModel, ChatRequest, ChatResponse, ChunkStream, Generation, LlmResult,
    ToolCallDelta,
};
pub use gemini::GeminiProvider;
pub use ollama::{OllamaModel, OllamaProvider};
pub use registry::{ProviderCtor, ProviderRegistry};
pub use retry::RetryPolicy;
pub use traits::{CallOptions, LlmProvider, TextStream};

/// Fail construction of an adapter whose backing client was compiled out.
pub(crate) fn require_feature(provider: &str, feature: &str, enabled: bool) -> Result<()> {
    if enabled {
        return Ok(());
    }
    let err = Error::dependency_missing(provider, feature);
    error!("{}", err);
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_feature() {
        assert!(require_feature("gemini", "gemini", true).is_ok());

        let err = require_feature("gemini", "gemini", false).unwrap_err();
        assert!(matches!(
            err,
            Error::DependencyMissing { ref provider, ref feature } if provider == "gemini" && feature == "gemini"
        ));
        assert!(err.to_string().contains("'gemini' feature"));
    }
}
