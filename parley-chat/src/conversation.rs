//! A bounded rolling conversation with a completion backend.

use std::ops::DerefMut;
use std::pin::Pin;
use std::sync::Arc;

use async_stream::stream;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use parley_core::message::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use parley_core::{CompletionBackend, CompletionRequest, Message};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{ChatError, Result};

/// Exchanges (user + assistant pairs) kept when the caller does not say.
pub const DEFAULT_HISTORY_EXCHANGES: usize = 10;

/// Messages shown in a [`ConversationSummary`].
const SUMMARY_TAIL: usize = 4;

/// A stream of reply fragments. A failure is always the final item.
pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Per-call options for [`ConversationSession::send`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    pub system_prompt: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self { system_prompt: None, max_tokens: DEFAULT_MAX_TOKENS, temperature: DEFAULT_TEMPERATURE }
    }
}

impl ChatOptions {
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// Read-only view of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub message_count: usize,
    pub started_at: DateTime<Utc>,
    /// Up to the four most recent messages, oldest first.
    pub last_messages: Vec<Message>,
}

impl ConversationSummary {
    /// The summary of a conversation that has not started.
    pub fn empty() -> Self {
        Self { message_count: 0, started_at: Utc::now(), last_messages: Vec::new() }
    }
}

/// Ordered chat history capped at `2 × max_exchanges` messages.
///
/// Each exchange is sent with the retained history as context and, once the
/// reply is known, appended to it; the oldest messages are dropped first.
pub struct ConversationSession {
    backend: Arc<dyn CompletionBackend>,
    history: Vec<Message>,
    max_exchanges: usize,
    started_at: DateTime<Utc>,
}

impl std::fmt::Debug for ConversationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationSession")
            .field("backend", &self.backend.name())
            .field("message_count", &self.history.len())
            .field("max_exchanges", &self.max_exchanges)
            .field("started_at", &self.started_at)
            .finish()
    }
}

impl ConversationSession {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self::with_max_exchanges(backend, DEFAULT_HISTORY_EXCHANGES)
    }

    pub fn with_max_exchanges(backend: Arc<dyn CompletionBackend>, max_exchanges: usize) -> Self {
        Self { backend, history: Vec::new(), max_exchanges, started_at: Utc::now() }
    }

    /// Maximum number of retained messages.
    pub fn capacity(&self) -> usize {
        self.max_exchanges.saturating_mul(2)
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Send `message` and record the exchange once the reply arrives.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Backend`] if the completion fails; history is
    /// left unchanged in that case.
    pub async fn send(&mut self, message: &str, options: &ChatOptions) -> Result<String> {
        let request = self.request_for(message, options);
        debug!(history = self.history.len(), "sending chat message");

        let reply = self.backend.complete(request).await.map_err(|e| {
            error!(error = %e, "chat completion failed");
            ChatError::Backend(e)
        })?;

        self.record_exchange(message, &reply);
        Ok(reply)
    }

    /// Stream the reply to `message`, recording the exchange when the stream ends.
    ///
    /// The session is moved into the stream so callers can hand over an owned
    /// lock guard and keep the session locked until the reply completes. If the
    /// backend fails partway, whatever arrived so far is recorded and the error
    /// is yielded last; a failure before the first fragment records nothing.
    pub fn send_stream<S>(mut session: S, message: String, options: ChatOptions) -> ReplyStream
    where
        S: DerefMut<Target = Self> + Send + 'static,
    {
        Box::pin(stream! {
            let request = session.request_for(&message, &options);
            let backend = Arc::clone(&session.backend);

            match backend.complete_stream(request).await {
                Err(e) => {
                    error!(error = %e, "failed to open chat stream");
                    yield Err(ChatError::Backend(e));
                }
                Ok(mut fragments) => {
                    let mut reply = String::new();
                    let mut failure = None;
                    while let Some(item) = fragments.next().await {
                        match item {
                            Ok(fragment) => {
                                reply.push_str(&fragment);
                                yield Ok(fragment);
                            }
                            Err(e) => {
                                failure = Some(e);
                                break;
                            }
                        }
                    }

                    match failure {
                        None => session.record_exchange(&message, &reply),
                        Some(e) => {
                            warn!(error = %e, received = reply.len(), "chat stream failed partway");
                            if !reply.is_empty() {
                                session.record_exchange(&message, &reply);
                            }
                            yield Err(ChatError::Backend(e));
                        }
                    }
                }
            }
        })
    }

    /// Forget every message. The start time is kept.
    pub fn clear(&mut self) {
        self.history.clear();
        info!("conversation history cleared");
    }

    pub fn summary(&self) -> ConversationSummary {
        let tail = self.history.len().saturating_sub(SUMMARY_TAIL);
        ConversationSummary {
            message_count: self.history.len(),
            started_at: self.started_at,
            last_messages: self.history[tail..].to_vec(),
        }
    }

    fn request_for(&self, message: &str, options: &ChatOptions) -> CompletionRequest {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        if let Some(system) = options.system_prompt.as_deref().filter(|s| !s.is_empty()) {
            messages.push(Message::system(system));
        }
        let start = self.history.len().saturating_sub(self.capacity());
        messages.extend(self.history[start..].iter().cloned());
        messages.push(Message::user(message));

        CompletionRequest::new(messages)
            .max_tokens(options.max_tokens)
            .temperature(options.temperature)
    }

    fn record_exchange(&mut self, message: &str, reply: &str) {
        self.history.push(Message::user(message));
        self.history.push(Message::assistant(reply));
        let excess = self.history.len().saturating_sub(self.capacity());
        if excess > 0 {
            self.history.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use parley_core::{BackendError, Role};
    use parley_model::MockBackend;

    use super::*;

    #[tokio::test]
    async fn system_prompt_history_then_message() {
        let backend = Arc::new(MockBackend::new().with_reply("one").with_reply("two"));
        let mut session = ConversationSession::new(backend.clone());

        session.send("first", &ChatOptions::default()).await.unwrap();
        let options = ChatOptions::default().with_system_prompt("be terse");
        assert_eq!(session.send("second", &options).await.unwrap(), "two");

        let request = backend.last_request().unwrap();
        let roles: Vec<Role> = request.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert_eq!(request.messages[3].content, "second");
        assert_eq!(request.max_tokens, 1000);
        assert_eq!(request.temperature, 0.7);
    }

    #[tokio::test]
    async fn failed_send_leaves_history_alone() {
        let backend = Arc::new(MockBackend::new().with_failure(BackendError::EmptyResponse {
            provider: "mock".into(),
        }));
        let mut session = ConversationSession::new(backend);

        assert!(session.send("hi", &ChatOptions::default()).await.is_err());
        assert_eq!(session.summary().message_count, 0);
    }

    #[tokio::test]
    async fn summary_shows_last_four() {
        let mut session = ConversationSession::new(Arc::new(MockBackend::new()));
        for i in 0..3 {
            session.send(&format!("m{i}"), &ChatOptions::default()).await.unwrap();
        }
        let summary = session.summary();
        assert_eq!(summary.message_count, 6);
        assert_eq!(summary.last_messages.len(), 4);
        assert_eq!(summary.last_messages[0].content, "m1");

        let started = summary.started_at;
        session.clear();
        let cleared = session.summary();
        assert_eq!(cleared.message_count, 0);
        assert!(cleared.last_messages.is_empty());
        assert_eq!(cleared.started_at, started);
    }

    #[tokio::test]
    async fn history_drops_oldest_first() {
        let mut session = ConversationSession::with_max_exchanges(Arc::new(MockBackend::new()), 2);
        for i in 0..5 {
            session.send(&format!("m{i}"), &ChatOptions::default()).await.unwrap();
        }
        let users: Vec<&str> = session
            .history()
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(users, vec!["m3", "m4"]);
    }
}
