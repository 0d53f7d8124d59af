//! Sequential tool chains
//!
//! Fixed pipelines where each step's output feeds later steps through
//! `{key}` placeholders resolved against a per-run context.

pub mod context;
pub mod definition;
pub mod runner;
pub mod manager;

pub use context::{ExecutionContext, SeedContext, INPUT_KEY};
pub use definition::{ChainBuilder, ChainDefinition, ChainStep};
pub use runner::{ChainOutput, SequentialChainRunner};
pub use manager::{research_and_calculate, ChainManager, RESEARCH_CHAIN};
