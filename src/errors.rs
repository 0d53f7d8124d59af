//! Error types for toolbuddy
//!
//! Hard failures only. Tool-level problems inside the agent loop never
//! surface here; they are folded back into the conversation as text.

use thiserror::Error;

/// Main error type for the toolbuddy engine
#[derive(Error, Debug)]
pub enum AgentError {
    /// Loop state machine transition errors
    #[error("Invalid state transition from {from:?} to {to:?}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    /// Model collaborator could not return a response
    #[error("Model transport failed, no final answer was produced: {0}")]
    Transport(String),

    /// Chain template referenced a key that is not in the execution context
    #[error("Chain step {step}: template variable '{key}' not found in context")]
    MissingContextVariable { key: String, step: usize },

    /// Chain step tried to write a key the context reserves
    #[error("Chain step {step}: output key '{key}' is reserved")]
    ReservedOutputKey { key: String, step: usize },

    /// Chain has no steps to run
    #[error("Chain '{0}' has no steps")]
    EmptyChain(String),

    /// Chain name not registered in the manager
    #[error("Chain '{0}' does not exist")]
    ChainNotFound(String),

    /// Tool lookup failed
    #[error("Tool '{0}' not found")]
    ToolNotFound(String),

    /// Tool ran and reported a failure
    #[error("Tool '{tool}' failed: {message}")]
    ToolInvocation { tool: String, message: String },

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Timeout errors
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
}

impl AgentError {
    /// Shorthand used by tool implementations
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        AgentError::ToolInvocation {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, AgentError>;
