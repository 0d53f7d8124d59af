//! System prompt construction

use crate::tools::ToolRegistry;

/// Base prompt used when none is configured
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant. Your answers are always detailed, thorough and complete.";

/// Build the system prompt, adding the tools section when tools are usable
pub fn build_system_prompt(
    base: Option<&str>,
    registry: &ToolRegistry,
    tool_calling: bool,
) -> String {
    let base = base
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);

    if !tool_calling || registry.is_empty() {
        return base.to_string();
    }

    let mut prompt = String::from(base);
    prompt.push_str("\n\n## Available tools\n");
    prompt.push_str("You can use the following tools to help answer questions:\n");
    prompt.push_str(&registry.descriptions());
    prompt.push('\n');

    prompt.push_str("\n## Tool call format\n");
    prompt.push_str("When you need a tool, write:\n");
    prompt.push_str("`[TOOL_CALL:{tool_name}:{parameters}]`\n");
    prompt.push_str(
        "For example: `[TOOL_CALL:search:Rust programming]` or \
         `[TOOL_CALL:memory:action=search,query=user info]`\n",
    );
    prompt.push_str("Several tool calls in one reply run together.\n\n");
    prompt.push_str(
        "Tool results are added to the conversation automatically; \
         continue your answer based on them.\n",
    );
    prompt
}
