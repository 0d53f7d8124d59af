//! Command-line argument parsing for toolbuddy
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// toolbuddy - local model agent with text-directive tool calling
#[derive(Parser, Debug)]
#[command(name = "toolbuddy")]
#[command(version)]
#[command(about = "Let a local Ollama model call tools through [TOOL_CALL:name:params] directives", long_about = None)]
pub struct Args {
    /// Ollama model to use (overrides the config file)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Ollama base URL (overrides the config file)
    #[arg(long)]
    pub ollama_url: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Disable tool calling; the model answers in one call
    #[arg(long)]
    pub no_tools: bool,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except final result)
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Ask one question and print the answer
    Ask {
        /// Question for the agent
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// Print the reply as it is generated; tools are not used
        #[arg(long)]
        stream: bool,
    },

    /// Start an interactive session that keeps history
    Chat,

    /// Run a registered chain
    Chain {
        /// Chain name
        name: String,

        /// Initial input
        input: String,

        /// Extra context values, KEY=VALUE
        #[arg(short = 's', long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },

    /// List registered tools and chains
    Tools,

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }
}

impl Verbosity {
    /// Default tracing filter for this level
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "toolbuddy=info,warn",
            Verbosity::VeryVerbose => "toolbuddy=debug,info",
        }
    }

    /// Check if should show progress spinners
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show run statistics
    pub fn show_stats(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}

/// Split `KEY=VALUE` on the first `=`
pub fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}
