//! Tool execution system
//!
//! Provides the tool capability contract and its runtime:
//! - Name-keyed registry of [`Tool`] implementations
//! - Parallel dispatcher (4 concurrent invocations by default)
//! - Built-in calculator, memory and search tools

pub mod types;
pub mod registry;
pub mod executor;
pub mod implementations;

// Re-export commonly used types
pub use types::{ToolInput, ToolOutcome, ToolRequest};
pub use registry::{Tool, ToolRegistry};
pub use executor::{ParallelDispatcher, DEFAULT_MAX_PARALLEL, DEFAULT_TOOL_TIMEOUT};
