//! Chat messages and completion requests.

use serde::{Deserialize, Serialize};

/// Default completion length when the caller does not set one.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Default sampling temperature for conversational replies.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// The author of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
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
}

/// An ordered list of messages plus sampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    /// Create a request with the default sampling parameters.
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages, max_tokens: DEFAULT_MAX_TOKENS, temperature: DEFAULT_TEMPERATURE }
    }

    /// Build the common `system` + `user` pair used by single-shot tasks.
    pub fn with_system(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self::new(vec![Message::system(system), Message::user(user)])
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}
