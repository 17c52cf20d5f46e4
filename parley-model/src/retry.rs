//! Retrying wrapper around a completion backend.

use std::sync::Arc;

use async_trait::async_trait;
use parley_core::{CompletionBackend, CompletionRequest, RetryPolicy, TextStream};

/// A [`CompletionBackend`] that retries transient failures of its inner backend.
///
/// Streaming calls are retried only while the stream is being established;
/// once fragments flow, a failure is surfaced to the consumer as-is.
pub struct RetryingBackend {
    inner: Arc<dyn CompletionBackend>,
    policy: RetryPolicy,
}

impl RetryingBackend {
    pub fn new(inner: Arc<dyn CompletionBackend>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl CompletionBackend for RetryingBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, request: CompletionRequest) -> parley_core::Result<String> {
        self.policy.run("complete", || self.inner.complete(request.clone())).await
    }

    async fn complete_stream(&self, request: CompletionRequest) -> parley_core::Result<TextStream> {
        self.policy.run("complete_stream", || self.inner.complete_stream(request.clone())).await
    }
}

#[cfg(test)]
mod tests {
    use parley_core::{BackendError, Message};

    use super::*;
    use crate::mock::MockBackend;

    #[tokio::test(start_paused = true)]
    async fn retries_throttled_completion() {
        let mock = Arc::new(
            MockBackend::new()
                .with_failure(BackendError::Status {
                    provider: "mock".into(),
                    status: 429,
                    message: "slow down".into(),
                })
                .with_reply("ok"),
        );
        let backend = RetryingBackend::new(mock.clone(), RetryPolicy::default());

        let reply = backend.complete(CompletionRequest::new(vec![Message::user("hi")])).await;
        assert_eq!(reply.unwrap(), "ok");
        assert_eq!(mock.requests().len(), 2);
    }

    #[tokio::test]
    async fn does_not_retry_auth_failure() {
        let mock = Arc::new(MockBackend::new().with_failure(BackendError::Status {
            provider: "mock".into(),
            status: 401,
            message: "bad key".into(),
        }));
        let backend = RetryingBackend::new(mock.clone(), RetryPolicy::default());

        let reply = backend.complete(CompletionRequest::new(vec![Message::user("hi")])).await;
        assert!(reply.is_err());
        assert_eq!(mock.requests().len(), 1);
    }
}
