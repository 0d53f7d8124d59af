//! Tool execution types and structures
//!
//! Core types for tool input, dispatch requests, and outcomes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Input handed to a tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ToolInput {
    /// A single positional string, passed through unsplit
    Raw(String),

    /// Named parameters interpreted from a directive
    Named(BTreeMap<String, String>),
}

/// Keys consulted, in order, when a named input is read as plain text
const TEXT_KEYS: [&str; 4] = ["input", "query", "expression", "content"];

impl ToolInput {
    /// Build a named input from key/value pairs
    pub fn named<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        ToolInput::Named(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Look up a named parameter. Raw input has no names.
    pub fn get(&self, key: &str) -> Option<&str> {
        match self {
            ToolInput::Raw(_) => None,
            ToolInput::Named(map) => map.get(key).map(String::as_str),
        }
    }

    /// Read the input as one string
    ///
    /// Raw input is returned as is; named input yields the first
    /// conventional key present (`input`, `query`, `expression`, `content`).
    pub fn text(&self) -> Option<&str> {
        match self {
            ToolInput::Raw(s) => Some(s.as_str()),
            ToolInput::Named(map) => TEXT_KEYS
                .iter()
                .find_map(|k| map.get(*k).map(String::as_str)),
        }
    }
}

impl From<&str> for ToolInput {
    fn from(s: &str) -> Self {
        ToolInput::Raw(s.to_string())
    }
}

impl From<String> for ToolInput {
    fn from(s: String) -> Self {
        ToolInput::Raw(s)
    }
}

/// One entry of a dispatch batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRequest {
    pub tool: String,
    pub input: ToolInput,
}

impl ToolRequest {
    pub fn new(tool: impl Into<String>, input: impl Into<ToolInput>) -> Self {
        Self {
            tool: tool.into(),
            input: input.into(),
        }
    }
}

/// Result of one tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// Tool name that was executed
    pub tool: String,

    /// Tool output text (empty on failure)
    pub output: String,

    /// Whether execution was successful
    pub success: bool,

    /// Execution duration in milliseconds
    pub duration_ms: u64,

    /// Error message if failed
    pub error: Option<String>,
}

impl ToolOutcome {
    /// Create successful outcome
    pub fn success(tool: String, output: String, duration: Duration) -> Self {
        Self {
            tool,
            output,
            success: true,
            duration_ms: duration.as_millis() as u64,
            error: None,
        }
    }

    /// Create failed outcome
    pub fn failure(tool: String, error: String, duration: Duration) -> Self {
        Self {
            tool,
            output: String::new(),
            success: false,
            duration_ms: duration.as_millis() as u64,
            error: Some(error),
        }
    }

    /// Text shown to the model for this outcome
    pub fn observation(&self) -> String {
        if self.success {
            format!("Tool {} result:\n{}", self.tool, self.output)
        } else {
            format!(
                "Tool {} failed: {}",
                self.tool,
                self.error.as_deref().unwrap_or("unknown error")
            )
        }
    }

    /// Output on success, error-shaped text otherwise
    pub fn into_text(self) -> String {
        if self.success {
            self.output
        } else {
            format!("Error: {}", self.error.unwrap_or_default())
        }
    }
}
