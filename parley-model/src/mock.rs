//! Scripted completion backend for tests and offline runs.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::stream;
use parley_core::{BackendError, CompletionBackend, CompletionRequest, TextStream};

const DEFAULT_REPLY: &str = "This is a mock response.";

/// One scripted outcome of a [`MockBackend`] call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// A complete response; streamed as a single fragment.
    Text(String),
    /// A streamed response: fragments in order, optionally ending in an error.
    Fragments(Vec<String>, Option<BackendError>),
    /// The call fails before producing anything.
    Fail(BackendError),
}

/// A [`CompletionBackend`] that replays scripted replies and records every request.
///
/// Replies are consumed in order; once the script is exhausted the default
/// reply is returned.
///
/// # Example
///
/// ```rust,ignore
/// use parley_model::MockBackend;
///
/// let backend = MockBackend::new().with_reply("first").with_reply("second");
/// ```
#[derive(Debug)]
pub struct MockBackend {
    default_reply: String,
    script: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            default_reply: DEFAULT_REPLY.to_string(),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Reply used once the script runs out.
    pub fn with_default_reply(mut self, reply: impl Into<String>) -> Self {
        self.default_reply = reply.into();
        self
    }

    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        self.push(MockReply::Text(reply.into()))
    }

    pub fn with_fragments<S: Into<String>>(self, fragments: impl IntoIterator<Item = S>) -> Self {
        self.push(MockReply::Fragments(fragments.into_iter().map(Into::into).collect(), None))
    }

    /// A stream that yields `fragments` and then fails with `error`.
    pub fn with_broken_stream<S: Into<String>>(
        self,
        fragments: impl IntoIterator<Item = S>,
        error: BackendError,
    ) -> Self {
        self.push(MockReply::Fragments(
            fragments.into_iter().map(Into::into).collect(),
            Some(error),
        ))
    }

    pub fn with_failure(self, error: BackendError) -> Self {
        self.push(MockReply::Fail(error))
    }

    fn push(self, reply: MockReply) -> Self {
        lock(&self.script).push_back(reply);
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.requests).clone()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        lock(&self.requests).last().cloned()
    }

    fn next_reply(&self, request: CompletionRequest) -> MockReply {
        lock(&self.requests).push(request);
        lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| MockReply::Text(self.default_reply.clone()))
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> parley_core::Result<String> {
        match self.next_reply(request) {
            MockReply::Text(text) => Ok(text),
            MockReply::Fragments(fragments, None) => Ok(fragments.concat()),
            MockReply::Fragments(_, Some(error)) | MockReply::Fail(error) => Err(error),
        }
    }

    async fn complete_stream(&self, request: CompletionRequest) -> parley_core::Result<TextStream> {
        let items: Vec<parley_core::Result<String>> = match self.next_reply(request) {
            MockReply::Text(text) => vec![Ok(text)],
            MockReply::Fragments(fragments, error) => {
                fragments.into_iter().map(Ok).chain(error.map(Err)).collect()
            }
            MockReply::Fail(error) => return Err(error),
        };
        Ok(Box::pin(stream::iter(items)))
    }
}
