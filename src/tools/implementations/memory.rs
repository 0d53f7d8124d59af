//! Memory tool
//!
//! In-process note store the model can write to and search. Actions:
//! `add` (content), `search` (query), `list`, `clear`.

use crate::errors::{AgentError, Result};
use crate::tools::registry::Tool;
use crate::tools::types::ToolInput;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use uuid::Uuid;

/// Registry name of the memory tool
pub const MEMORY_TOOL: &str = "memory";

/// One remembered note
#[derive(Debug, Clone)]
pub struct MemoryNote {
    pub id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Note store shared by every invocation of the tool
#[derive(Debug, Default)]
pub struct MemoryTool {
    notes: Mutex<Vec<MemoryNote>>,
}

impl MemoryTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored notes
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<MemoryNote>> {
        self.notes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn add(&self, content: &str) -> Result<String> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AgentError::tool(MEMORY_TOOL, "nothing to remember"));
        }
        let note = MemoryNote {
            id: Uuid::new_v4(),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        let id = note.id;
        self.lock().push(note);
        Ok(format!("Remembered ({})", id))
    }

    fn search(&self, query: &str) -> String {
        let needle = query.trim().to_lowercase();
        let notes = self.lock();
        let hits: Vec<&MemoryNote> = notes
            .iter()
            .filter(|n| n.content.to_lowercase().contains(&needle))
            .collect();

        if hits.is_empty() {
            format!("No memories matching '{}'", query.trim())
        } else {
            render(&hits)
        }
    }

    fn list(&self) -> String {
        let notes = self.lock();
        if notes.is_empty() {
            "No memories stored".to_string()
        } else {
            render(&notes.iter().collect::<Vec<_>>())
        }
    }

    fn clear(&self) -> String {
        let mut notes = self.lock();
        let count = notes.len();
        notes.clear();
        format!("Cleared {} memories", count)
    }
}

fn render(notes: &[&MemoryNote]) -> String {
    notes
        .iter()
        .map(|n| format!("- [{}] {}", n.created_at.format("%Y-%m-%d %H:%M"), n.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Tool for MemoryTool {
    fn name(&self) -> &str {
        MEMORY_TOOL
    }

    fn description(&self) -> &str {
        "Remember and recall notes. Params: action=add|search|list|clear, content=..., query=... (or recall=...)"
    }

    async fn invoke(&self, input: &ToolInput) -> Result<String> {
        // Raw text is a search, as is a bare query
        let action = match input {
            ToolInput::Raw(_) => "search",
            ToolInput::Named(_) => input.get("action").unwrap_or_else(|| {
                if input.get("content").is_some() {
                    "add"
                } else {
                    "search"
                }
            }),
        };

        match action {
            "add" => self.add(input.get("content").or(input.text()).unwrap_or_default()),
            "search" => {
                let query = input
                    .get("query")
                    .or(input.get("recall"))
                    .or(input.text())
                    .map(str::trim)
                    .filter(|q| !q.is_empty())
                    .ok_or_else(|| AgentError::tool(MEMORY_TOOL, "search query cannot be empty"))?;
                Ok(self.search(query))
            }
            "list" => Ok(self.list()),
            "clear" => Ok(self.clear()),
            other => Err(AgentError::tool(
                MEMORY_TOOL,
                format!("unknown action '{}'", other),
            )),
        }
    }
}
