//! Streaming facade over an agent run.
//!
//! The facade forwards every run event unchanged. A failure turns into one
//! [`StreamItem::Error`] and ends the stream, so consumers never see `Err`.
//! Whatever way the stream ends, the [`StreamObserver`] hears about it once.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use aiagent_core::{Message, ProviderOverrides, Settings, TokenUsage};
use aiagent_providers::{LlmProvider, ProviderRegistry};
use futures::{Stream, StreamExt};
use tracing::{error, info};

use crate::agent::{Agent, AgentEvent, AgentResult};
use crate::executor::{AgentExecutor, EventSource, EventStream};

/// One item of the facade stream.
#[derive(Debug, Clone)]
pub enum StreamItem {
    /// A run event, forwarded as-is.
    Chunk(AgentEvent),
    /// The run failed; nothing follows.
    Error(String),
}

impl StreamItem {
    pub fn is_error(&self) -> bool {
        matches!(self, StreamItem::Error(_))
    }
}

impl fmt::Display for StreamItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamItem::Chunk(event) => fmt::Display::fmt(event, f),
            StreamItem::Error(message) => write!(f, "An error occurred: {}", message),
        }
    }
}

/// Facade output; consumed once.
pub type FacadeStream = Pin<Box<dyn Stream<Item = StreamItem> + Send>>;

/// Who a streamed response belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamContext {
    pub user_id: u64,
    pub conversation_id: u64,
    pub user_message_id: u64,
}

/// What the facade saw by the time the stream ended.
#[derive(Debug, Clone, Default)]
pub struct StreamSummary {
    pub context: StreamContext,
    /// Items forwarded, the error item included
    pub chunks: usize,
    /// Bytes of streamed text
    pub response_len: usize,
    pub usage: TokenUsage,
    pub errored: bool,
}

/// Completion hook for facade streams.
pub trait StreamObserver: Send + Sync {
    /// Called once per stream, after the last item or when the stream is dropped.
    fn on_finish(&self, summary: &StreamSummary);
}

/// Logs the summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl StreamObserver for LogObserver {
    fn on_finish(&self, summary: &StreamSummary) {
        info!(
            user_id = summary.context.user_id,
            conversation_id = summary.context.conversation_id,
            errored = summary.errored,
            "Agent stream finished. Final response length: {}. Token summary: {:?}",
            summary.response_len,
            summary.usage
        );
    }
}

/// Reports the summary when dropped.
struct CompletionGuard {
    summary: StreamSummary,
    observer: Arc<dyn StreamObserver>,
}

impl CompletionGuard {
    fn record(&mut self, event: &AgentEvent) {
        self.summary.chunks += 1;
        match event {
            AgentEvent::TextDelta(text) => self.summary.response_len += text.len(),
            AgentEvent::RunComplete(result) => self.summary.usage = result.usage,
            _ => {}
        }
    }

    fn record_error(&mut self) {
        self.summary.chunks += 1;
        self.summary.errored = true;
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.observer.on_finish(&self.summary);
    }
}

/// Wrap a run's events in the facade policies.
pub fn forward(
    events: EventStream,
    context: StreamContext,
    observer: Arc<dyn StreamObserver>,
) -> FacadeStream {
    let mut guard = CompletionGuard {
        summary: StreamSummary {
            context,
            ..Default::default()
        },
        observer,
    };

    Box::pin(async_stream::stream! {
        let mut events = events;
        while let Some(event) = events.next().await {
            match event {
                Ok(event) => {
                    guard.record(&event);
                    yield StreamItem::Chunk(event);
                }
                Err(e) => {
                    error!(
                        user_id = guard.summary.context.user_id,
                        conversation_id = guard.summary.context.conversation_id,
                        "Error in agent stream: {}",
                        e
                    );
                    guard.record_error();
                    yield StreamItem::Error(e.to_string());
                    break;
                }
            }
        }
        drop(guard);
    })
}

/// Builds per-conversation executors on the configured provider.
pub struct AgentFactory {
    provider: Box<dyn LlmProvider>,
    max_iterations: usize,
    observer: Arc<dyn StreamObserver>,
}

impl AgentFactory {
    /// Factory on the provider named by `DEFAULT_LLM_PROVIDER`.
    pub fn new(settings: &Settings) -> aiagent_core::Result<Self> {
        let provider =
            ProviderRegistry::builtin().resolve_default(settings, ProviderOverrides::none())?;
        Ok(Self::with_provider(provider, settings.agent_max_iterations))
    }

    pub fn with_provider(provider: Box<dyn LlmProvider>, max_iterations: usize) -> Self {
        Self {
            provider,
            max_iterations,
            observer: Arc::new(LogObserver),
        }
    }

    /// Replace the completion observer.
    pub fn with_observer(mut self, observer: Arc<dyn StreamObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn provider(&self) -> &dyn LlmProvider {
        self.provider.as_ref()
    }

    /// A tool-less executor for one user conversation.
    pub fn create_agent_executor(
        &self,
        user_id: u64,
        conversation_id: u64,
    ) -> AgentResult<AgentExecutor> {
        let agent = Agent::builder("assistant")
            .model(self.provider.get_model())
            .build()?;

        info!(
            "Agent executor created for user: {}, conversation: {}",
            user_id, conversation_id
        );
        Ok(AgentExecutor::new(agent, self.max_iterations))
    }

    /// Stream a response to `user_input` through the facade.
    pub fn stream_agent_response(
        &self,
        executor: &dyn EventSource,
        user_input: &str,
        chat_history: Vec<Message>,
        user_id: u64,
        conversation_id: u64,
        user_message_id: u64,
    ) -> FacadeStream {
        info!(
            user_id,
            conversation_id,
            user_message_id,
            "Starting agent streaming"
        );

        let context = StreamContext {
            user_id,
            conversation_id,
            user_message_id,
        };
        forward(
            executor.astream(user_input, chat_history),
            context,
            Arc::clone(&self.observer),
        )
    }
}

impl fmt::Debug for AgentFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentFactory")
            .field("provider", &self.provider.id())
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}
