//! Agent executor: streamed model turns with tool calling.
//!
//! ## Loop
//!
//! ```text
//! messages = [instructions?, history.., user input]
//! repeat up to max_iterations:
//!   stream one completion  -> TextDelta events
//!   no tool calls?         -> MessageOutput, RunComplete, stop
//!   run tool calls         -> ToolCalled / ToolOutput events
//!   append results         -> next turn
//! ```

use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::Arc;

use aiagent_core::{Message, TokenUsage, ToolCall};
use aiagent_providers::{ChatRequest, ToolCallDelta};
use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::agent::{Agent, AgentError, AgentEvent, AgentResult, RunResult};

/// Ordered run events; consumed once.
pub type EventStream = Pin<Box<dyn Stream<Item = AgentResult<AgentEvent>> + Send>>;

/// Anything that can be driven to produce a run's event stream.
pub trait EventSource: Send + Sync {
    /// Start a run for `input` on top of `history`.
    fn astream(&self, input: &str, history: Vec<Message>) -> EventStream;
}

/// Runs an [`Agent`] to completion.
#[derive(Debug, Clone)]
pub struct AgentExecutor {
    agent: Arc<Agent>,
    max_iterations: usize,
}

impl AgentExecutor {
    /// Create an executor allowing at most `max_iterations` model turns per run.
    pub fn new(agent: Agent, max_iterations: usize) -> Self {
        Self {
            agent: Arc::new(agent),
            max_iterations: max_iterations.max(1),
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Run to completion and return the final result.
    pub async fn run(&self, input: &str) -> AgentResult<RunResult> {
        let mut events = self.astream(input, Vec::new());
        while let Some(event) = events.next().await {
            if let AgentEvent::RunComplete(result) = event? {
                return Ok(result);
            }
        }
        Err(AgentError::Stream("run ended without a result".into()))
    }
}

impl EventSource for AgentExecutor {
    fn astream(&self, input: &str, history: Vec<Message>) -> EventStream {
        let agent = Arc::clone(&self.agent);
        let max_iterations = self.max_iterations;

        let mut messages = Vec::with_capacity(history.len() + 2);
        if !agent.instructions().is_empty() {
            messages.push(Message::system(agent.instructions()));
        }
        messages.extend(history);
        messages.push(Message::user(input));

        Box::pin(async_stream::stream! {
            info!(agent = %agent.name(), "Run starting");
            yield Ok(AgentEvent::AgentUpdated { name: agent.name().to_string() });

            let tools = agent.tool_definitions();
            let mut usage = TokenUsage::default();

            for turn in 1..=max_iterations {
                debug!(turn, "Running agent turn");

                let request = ChatRequest::new(messages.clone())
                    .with_tools(tools.clone())
                    .with_temperature(agent.model_settings().temperature);

                let mut chunks = match agent.model().stream(request).await {
                    Ok(chunks) => chunks,
                    Err(e) => {
                        yield Err(AgentError::from(e));
                        return;
                    }
                };

                let mut content = String::new();
                let mut builder = ToolCallBuilder::new();

                while let Some(chunk) = chunks.next().await {
                    let chunk = match chunk {
                        Ok(chunk) => chunk,
                        Err(e) => {
                            yield Err(AgentError::from(e));
                            return;
                        }
                    };

                    if let Some(chunk_usage) = chunk.usage {
                        usage += chunk_usage;
                    }
                    for delta in &chunk.tool_calls {
                        builder.apply_delta(delta);
                    }
                    if let Some(text) = chunk.content {
                        if !text.is_empty() {
                            content.push_str(&text);
                            yield Ok(AgentEvent::TextDelta(text));
                        }
                    }
                }

                let tool_calls = builder.build();
                if tool_calls.is_empty() {
                    info!(turns = turn, "Run complete");
                    yield Ok(AgentEvent::MessageOutput(content.clone()));
                    yield Ok(AgentEvent::RunComplete(RunResult {
                        final_output: content,
                        usage,
                        turns: turn,
                    }));
                    return;
                }

                messages.push(Message::assistant_with_tools(content, tool_calls.clone()));
                for call in &tool_calls {
                    yield Ok(AgentEvent::ToolCalled(call.clone()));
                }

                for result in agent.tools().execute_all(&tool_calls).await {
                    messages.push(Message::tool_result(
                        result.tool_call_id.clone(),
                        result.content_for_model(),
                    ));
                    yield Ok(AgentEvent::ToolOutput(result));
                }
            }

            warn!(max_iterations, "Max iterations exceeded");
            yield Err(AgentError::MaxIterations(max_iterations));
        })
    }
}

// ============================================================================
// Tool Call Builder (for streaming)
// ============================================================================

/// Accumulates tool calls from streamed deltas, keyed by call index.
#[derive(Debug, Default)]
struct ToolCallBuilder {
    calls: BTreeMap<u32, PartialToolCall>,
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

impl ToolCallBuilder {
    fn new() -> Self {
        Self::default()
    }

    fn apply_delta(&mut self, delta: &ToolCallDelta) {
        let call = self.calls.entry(delta.index).or_default();

        if let Some(id) = &delta.id {
            call.id = Some(id.clone());
        }
        if let Some(name) = &delta.name {
            call.name = Some(name.clone());
        }
        if let Some(args) = &delta.arguments {
            call.arguments.push_str(args);
        }
    }

    fn build(self) -> Vec<ToolCall> {
        self.calls
            .into_iter()
            .filter_map(|(index, partial)| {
                let name = partial.name?;
                let id = partial.id.unwrap_or_else(|| format!("call_{}", index));
                let arguments = if partial.arguments.trim().is_empty() {
                    serde_json::json!({})
                } else {
                    serde_json::from_str(&partial.arguments).unwrap_or_else(|e| {
                        warn!("Tool {} sent invalid JSON arguments: {}", name, e);
                        serde_json::json!({})
                    })
                };
                Some(ToolCall::new(id, name, arguments))
            })
            .collect()
    }
}
