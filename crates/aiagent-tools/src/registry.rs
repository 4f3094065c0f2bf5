//! Tool registry for managing available tools.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use aiagent_core::{ToolCall, ToolDefinition, ToolResult};
use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::ToolError;

/// Trait for implementing tools.
///
/// Each tool has a name, a definition (including the JSON schema for its
/// parameters) and an async execute method.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the unique name of this tool.
    fn name(&self) -> &str;

    /// Get the tool definition including parameter schema.
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool.
    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError>;

    /// Validate the arguments before execution.
    ///
    /// Default implementation does no validation.
    fn validate(&self, _arguments: &serde_json::Value) -> Result<(), ToolError> {
        Ok(())
    }
}

/// Registry of available tools.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Check if a tool exists.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List all tool names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// All tool definitions, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> =
            self.tools.values().map(|t| t.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool call.
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;

        tool.validate(&call.arguments)?;

        let start = Instant::now();
        let mut result = tool.execute(call).await?;
        result.duration_ms = start.elapsed().as_millis() as u64;

        debug!(tool = %call.name, duration_ms = result.duration_ms, "Tool executed");
        Ok(result)
    }

    /// Execute several calls concurrently, in call order.
    ///
    /// Failures become error results so the model can see them.
    pub async fn execute_all(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        join_all(calls.iter().map(|call| async move {
            match self.execute(call).await {
                Ok(result) => result,
                Err(e) => {
                    warn!("Tool {} failed: {}", call.name, e);
                    ToolResult::error(&call.id, e.to_string())
                }
            }
        }))
        .await
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.list())
            .finish()
    }
}
