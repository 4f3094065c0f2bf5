//! # aiagent-agent
//!
//! Agent runs and the streaming facade for aiagent.
//!
//! This crate provides:
//! - [`Agent`] definitions and [`AgentExecutor`], the streamed tool-calling loop
//! - [`AgentFactory`], which builds executors on the configured provider and
//!   wraps their event streams in the error-item and completion policies

pub mod agent;
pub mod executor;
pub mod factory;

pub use agent::{
    Agent, AgentBuilder, AgentError, AgentEvent, AgentResult, ModelSettings, RunResult,
};
pub use executor::{AgentExecutor, EventSource, EventStream};
pub use factory::{
    forward, AgentFactory, FacadeStream, LogObserver, StreamContext, StreamItem, StreamObserver,
    StreamSummary,
};
