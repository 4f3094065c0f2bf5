//! # aiagent-tools
//!
//! Tools an agent can call.
//!
//! Tools implement the [`Tool`] trait and are registered with a
//! [`ToolRegistry`], which handles lookup by name and execution with timing
//! and validation.
//!
//! ## Example
//!
//! ```ignore
//! use aiagent_tools::{HowManyJokesTool, ToolRegistry};
//! use std::sync::Arc;
//!
//! let registry = ToolRegistry::new().with(Arc::new(HowManyJokesTool));
//! let call = ToolCall::new("call_1", "how_many_jokes", json!({}));
//! let result = registry.execute(&call).await?;
//! ```

use thiserror::Error;

pub mod jokes;
pub mod registry;

pub use jokes::HowManyJokesTool;
pub use registry::{Tool, ToolRegistry};

/// Errors that can occur during tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool was not found in the registry.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// Required parameter is missing.
    #[error("missing required parameter: {0}")]
    MissingParameter(String),
}

impl ToolError {
    /// Create a missing parameter error.
    pub fn missing_param(name: impl Into<String>) -> Self {
        Self::MissingParameter(name.into())
    }
}
