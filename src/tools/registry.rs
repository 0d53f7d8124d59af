//! Tool registry
//!
//! Name-keyed registry of tool capabilities. Every tool implements the
//! same [`Tool`] contract; the engine looks tools up by name and never
//! mutates them.

use crate::errors::Result;
use crate::tools::types::ToolInput;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Capability contract implemented by every tool
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique registry key
    fn name(&self) -> &str;

    /// One-line description shown to the model
    fn description(&self) -> &str;

    /// Run the tool
    ///
    /// Errors are captured by the caller and turned into text; they never
    /// abort an agent run.
    async fn invoke(&self, input: &ToolInput) -> Result<String>;
}

/// Tool registry
#[derive(Clone, Default)]
pub struct ToolRegistry {
    /// Map of tool name to implementation, sorted for stable listings
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Option<Arc<dyn Tool>> {
        self.tools.insert(tool.name().to_string(), tool)
    }

    /// Builder-style registration
    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.register(Arc::new(tool));
        self
    }

    /// Remove a tool by name
    pub fn unregister(&mut self, name: &str) -> bool {
        self.tools.remove(name).is_some()
    }

    /// Get tool by name
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Check if tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get all tool names, sorted
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// `- name: description` lines for the system prompt
    pub fn descriptions(&self) -> String {
        self.tools
            .values()
            .map(|tool| format!("- {}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Get total number of tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo(&'static str);

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "Echo the input back"
        }

        async fn invoke(&self, input: &ToolInput) -> Result<String> {
            Ok(input.text().unwrap_or_default().to_string())
        }
    }

    #[test]
    fn test_registry_creation() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ToolRegistry::new().with_tool(Echo("echo"));

        assert!(registry.contains("echo"));
        assert_eq!(registry.lookup("echo").unwrap().name(), "echo");
        assert!(registry.lookup("nonexistent_tool").is_none());
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = ToolRegistry::new().with_tool(Echo("echo"));
        let previous = registry.register(Arc::new(Echo("echo")));
        assert!(previous.is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister() {
        let mut registry = ToolRegistry::new().with_tool(Echo("echo"));
        assert!(registry.unregister("echo"));
        assert!(!registry.unregister("echo"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_tool_names_sorted() {
        let registry = ToolRegistry::new()
            .with_tool(Echo("search"))
            .with_tool(Echo("calculator"))
            .with_tool(Echo("memory"));

        assert_eq!(registry.tool_names(), vec!["calculator", "memory", "search"]);
    }

    #[test]
    fn test_descriptions() {
        let registry = ToolRegistry::new().with_tool(Echo("a")).with_tool(Echo("b"));
        assert_eq!(
            registry.descriptions(),
            "- a: Echo the input back\n- b: Echo the input back"
        );
    }

    #[tokio::test]
    async fn test_invoke_through_lookup() {
        let registry = ToolRegistry::new().with_tool(Echo("echo"));
        let tool = registry.lookup("echo").unwrap();
        let output = tool.invoke(&ToolInput::from("hello")).await.unwrap();
        assert_eq!(output, "hello");
    }
}
