//! The `how_many_jokes` tool.

use aiagent_core::{ToolCall, ToolDefinition, ToolResult};
use async_trait::async_trait;
use rand::Rng;
use tracing::debug;

use crate::registry::Tool;
use crate::ToolError;

/// Picks how many jokes to tell: a uniformly random integer in `1..=10`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HowManyJokesTool;

impl HowManyJokesTool {
    pub const NAME: &'static str = "how_many_jokes";

    /// Draw a joke count.
    pub fn pick() -> u32 {
        rand::thread_rng().gen_range(1..=10)
    }
}

#[async_trait]
impl Tool for HowManyJokesTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(Self::NAME, "Return a random integer of jokes to tell between 1 and 10 (inclusive).")
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let count = Self::pick();
        debug!(count, "Picked joke count");
        Ok(ToolResult::success(&call.id, count.to_string()))
    }
}
