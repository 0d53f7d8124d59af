//! Agent orchestration module
//!
//! Loop state machine, system prompt construction and the tool-calling agent.

pub mod state;
pub mod prompt;
pub mod orchestrator;

// Re-export commonly used types
pub use state::{LoopEvent, LoopState};
pub use prompt::{build_system_prompt, DEFAULT_SYSTEM_PROMPT};
pub use orchestrator::{fold_observations, AgentConfig, RunReport, ToolCallingAgent};
