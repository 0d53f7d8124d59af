//! Conversation messages and per-run conversation state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Speaker of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,

    /// Folded tool results
    Observation,
}

impl Role {
    /// Role name sent to the model; observations travel as user turns
    pub fn wire_name(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User | Role::Observation => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One conversation message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn observation(content: impl Into<String>) -> Self {
        Self::new(Role::Observation, content)
    }
}

/// Messages of one loop run plus its tool iteration counter
#[derive(Debug, Clone)]
pub struct ConversationState {
    messages: Vec<Message>,
    iteration: usize,
    max_iterations: usize,
}

impl ConversationState {
    /// Start a run: system prompt, prior history, then the new user input
    pub fn new(
        system_prompt: &str,
        history: &[Message],
        input: &str,
        max_iterations: usize,
    ) -> Self {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(system_prompt));
        messages.extend(history.iter().cloned());
        messages.push(Message::user(input));

        Self {
            messages,
            iteration: 0,
            max_iterations,
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Completed tool iterations
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Count one fold; returns true once the cap is reached
    pub fn complete_iteration(&mut self) -> bool {
        self.iteration += 1;
        self.cap_reached()
    }

    pub fn cap_reached(&self) -> bool {
        self.iteration >= self.max_iterations
    }
}
