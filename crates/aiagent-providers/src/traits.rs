//! Provider adapter trait.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde_json::Value;

use aiagent_core::{ProviderSettings, Result, TokenUsage};

use crate::chat_model::{ChatModel, ChatRequest};

/// Ordered text deltas of one streamed response; consumed once.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Per-call options for [`LlmProvider::ainvoke`] and [`LlmProvider::astream`].
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Overrides the adapter's temperature for this call
    pub temperature: Option<f32>,
    /// Stop sequences
    pub stop: Vec<String>,
}

impl CallOptions {
    pub fn request(&self, prompt: &str) -> ChatRequest {
        ChatRequest::from_prompt(prompt)
            .with_temperature(self.temperature)
            .with_stop(self.stop.clone())
    }
}

/// One remote chat model behind a uniform capability set.
#[async_trait]
pub trait LlmProvider: Send + Sync + std::fmt::Debug {
    /// Registry name.
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Settings the adapter was built with.
    fn settings(&self) -> &ProviderSettings;

    /// The underlying model handle. Every call returns the same handle.
    fn get_model(&self) -> Arc<ChatModel>;

    /// Send `prompt` and wait for the full text response.
    ///
    /// Usage metadata is discarded; transport and API errors propagate as-is.
    async fn ainvoke(&self, prompt: &str, options: CallOptions) -> Result<String> {
        let response = self.get_model().complete(options.request(prompt)).await?;
        Ok(response.content)
    }

    /// Send `prompt` and stream the response text.
    ///
    /// Yields one item per content frame; a frame without text yields `""`.
    async fn astream(&self, prompt: &str, options: CallOptions) -> Result<TextStream> {
        let chunks = self.get_model().stream(options.request(prompt)).await?;

        let text = chunks.filter_map(|chunk| async move {
            match chunk {
                Ok(chunk) if chunk.is_usage_only() => None,
                Ok(chunk) => Some(Ok(chunk.content.unwrap_or_default())),
                Err(e) => Some(Err(e)),
            }
        });
        Ok(Box::pin(text))
    }

    /// Read the token usage out of this provider's response metadata.
    fn get_token_usage(&self, metadata: &Value) -> TokenUsage;
}
