//! CLI module for toolbuddy
//!
//! Handles command-line argument parsing and configuration management.

pub mod config;
pub mod args;

pub use config::{Config, ModelConfig, ToolsConfig};
pub use args::{parse_assignment, Args, Commands, Verbosity};
