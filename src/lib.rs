//! toolbuddy - Tool Invocation & Orchestration Engine
//!
//! Lets a text-only language model use tools by writing
//! `[TOOL_CALL:name:params]` directives in its replies.
//!
//! # Architecture
//!
//! - **directive**: directive scanner and parameter interpretation
//! - **tools**: tool trait, registry, parallel dispatcher, built-in tools
//! - **chain**: sequential tool chains over a per-run execution context
//! - **agent**: orchestration loop state machine and the tool-calling agent
//! - **model**: model collaborator trait and the Ollama chat client

pub mod errors;
pub mod directive;
pub mod tools;
pub mod chain;
pub mod model;
pub mod agent;
pub mod telemetry;
pub mod cli;

// Re-export commonly used types
pub use errors::{AgentError, Result};
pub use agent::{AgentConfig, RunReport, ToolCallingAgent};
pub use chain::{ChainDefinition, ChainManager, SequentialChainRunner};
pub use tools::{ParallelDispatcher, Tool, ToolRegistry};
