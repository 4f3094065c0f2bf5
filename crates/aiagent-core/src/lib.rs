//! # aiagent-core
//!
//! Core types and abstractions for aiagent.
//!
//! This crate provides:
//! - Settings loaded from `aiagent.toml`, `.env` and the environment
//! - Message and tool primitives
//! - The token usage record
//! - Common error types

pub mod config;
pub mod error;
pub mod message;
pub mod tool;
pub mod usage;

pub use config::{ProviderOverrides, ProviderSettings, Settings};
pub use error::{Error, ProviderError, Result};
pub use message::{Message, Role};
pub use tool::{ToolCall, ToolDefinition, ToolResult};
pub use usage::TokenUsage;
