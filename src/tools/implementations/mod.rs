//! Built-in tool implementations

pub mod calculator;
pub mod memory;
pub mod search;

// Re-export for convenience
pub use calculator::{CalculatorTool, CALCULATOR_TOOL};
pub use memory::{MemoryTool, MEMORY_TOOL};
pub use search::{SearchProvider, SearchTool, SEARCH_TOOL};

use crate::tools::registry::ToolRegistry;
use tracing::info;

/// Registry with calculator and memory, plus search when a search key is set
pub fn builtin_registry(tavily_key_env: &str, serper_key_env: &str) -> ToolRegistry {
    let registry = ToolRegistry::new()
        .with_tool(CalculatorTool::new())
        .with_tool(MemoryTool::new());

    match SearchTool::from_env(tavily_key_env, serper_key_env) {
        Some(search) => {
            info!(providers = ?search.providers(), "search tool enabled");
            registry.with_tool(search)
        }
        None => {
            info!(
                tavily = tavily_key_env,
                serper = serper_key_env,
                "no search API key set, search tool disabled"
            );
            registry
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_without_search_key() {
        let registry = builtin_registry(
            "TOOLBUDDY_TEST_UNSET_SEARCH_KEY",
            "TOOLBUDDY_TEST_UNSET_SERPER_KEY",
        );
        assert_eq!(registry.tool_names(), ["calculator", "memory"]);
    }
}
