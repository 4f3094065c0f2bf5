//! Agent definition, run events and errors.
//!
//! An [`Agent`] is plain data: a name, instructions, a model handle and the
//! tools it may call. Running it is the job of
//! [`AgentExecutor`](crate::executor::AgentExecutor).

use std::fmt;
use std::sync::Arc;

use aiagent_core::{TokenUsage, ToolCall, ToolDefinition, ToolResult};
use aiagent_providers::ChatModel;
use aiagent_tools::{Tool, ToolRegistry};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while running an agent.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Error from the model endpoint or configuration.
    #[error(transparent)]
    Provider(#[from] aiagent_core::Error),

    /// The run used every allowed model turn without a final answer.
    #[error("Maximum iterations exceeded: {0}")]
    MaxIterations(usize),

    /// The event stream broke off.
    #[error("{0}")]
    Stream(String),

    /// Agent not properly configured.
    #[error("Not configured: {0}")]
    NotConfigured(String),
}

/// Result type for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

// ============================================================================
// Events
// ============================================================================

/// Outcome of a finished run.
#[derive(Debug, Clone, Default)]
pub struct RunResult {
    /// Text of the last model message
    pub final_output: String,
    /// Usage summed over every model turn
    pub usage: TokenUsage,
    /// Model turns taken
    pub turns: usize,
}

/// Something that happened during a run, in order.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// The run started with this agent.
    AgentUpdated { name: String },
    /// A piece of streamed model text.
    TextDelta(String),
    /// The model asked for a tool.
    ToolCalled(ToolCall),
    /// A tool finished.
    ToolOutput(ToolResult),
    /// The final model message, whole.
    MessageOutput(String),
    /// The run finished.
    RunComplete(RunResult),
}

impl AgentEvent {
    /// Streamed text carried by this event, if any.
    pub fn text_delta(&self) -> Option<&str> {
        match self {
            AgentEvent::TextDelta(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for AgentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentEvent::AgentUpdated { name } => write!(f, "Agent updated: {}", name),
            AgentEvent::TextDelta(text) => f.write_str(text),
            AgentEvent::ToolCalled(call) => write!(f, "-- Tool was called: {}", call.name),
            AgentEvent::ToolOutput(result) => {
                write!(f, "-- Tool output: {}", result.content_for_model())
            }
            AgentEvent::MessageOutput(text) => write!(f, "-- Message output:\n{}", text),
            AgentEvent::RunComplete(_) => f.write_str("=== Run complete ==="),
        }
    }
}

// ============================================================================
// Agent
// ============================================================================

/// Per-agent model parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModelSettings {
    /// Overrides the model's configured temperature
    pub temperature: Option<f32>,
}

impl ModelSettings {
    pub fn with_temperature(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
        }
    }
}

/// A named model with instructions and tools.
#[derive(Debug, Clone)]
pub struct Agent {
    name: String,
    instructions: String,
    model: Arc<ChatModel>,
    tools: ToolRegistry,
    model_settings: ModelSettings,
}

impl Agent {
    /// Start building an agent.
    pub fn builder(name: impl Into<String>) -> AgentBuilder {
        AgentBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// System instructions; empty when the agent has none.
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn model(&self) -> &Arc<ChatModel> {
        &self.model
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.definitions()
    }

    pub fn model_settings(&self) -> ModelSettings {
        self.model_settings
    }
}

// ============================================================================
// Agent Builder
// ============================================================================

/// Builder for constructing an [`Agent`].
pub struct AgentBuilder {
    name: String,
    instructions: String,
    model: Option<Arc<ChatModel>>,
    tools: ToolRegistry,
    model_settings: ModelSettings,
}

impl AgentBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: String::new(),
            model: None,
            tools: ToolRegistry::new(),
            model_settings: ModelSettings::default(),
        }
    }

    /// Set the system instructions.
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Set the model handle (required).
    pub fn model(mut self, model: Arc<ChatModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Add a tool.
    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.register(tool);
        self
    }

    /// Replace the tool registry.
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn model_settings(mut self, settings: ModelSettings) -> Self {
        self.model_settings = settings;
        self
    }

    /// Build the agent.
    pub fn build(self) -> AgentResult<Agent> {
        let model = self
            .model
            .ok_or_else(|| AgentError::NotConfigured("model is required".into()))?;

        Ok(Agent {
            name: self.name,
            instructions: self.instructions,
            model,
            tools: self.tools,
            model_settings: self.model_settings,
        })
    }
}
