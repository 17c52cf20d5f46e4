//! Completion backend trait.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::Result;
use crate::message::CompletionRequest;

/// An incremental sequence of response text fragments.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A chat-completion provider.
///
/// Implementations wrap a concrete API (OpenAI, Azure OpenAI, a mock) behind a
/// unified async interface. Streaming yields text fragments in arrival order;
/// the stream ends when the provider signals completion.
///
/// # Example
///
/// ```rust,ignore
/// use parley_core::{CompletionBackend, CompletionRequest, Message};
///
/// let reply = backend
///     .complete(CompletionRequest::new(vec![Message::user("Hello")]).max_tokens(10))
///     .await?;
/// ```
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// A short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Run a completion and return the full response text.
    async fn complete(&self, request: CompletionRequest) -> Result<String>;

    /// Run a completion and return the response as it is generated.
    async fn complete_stream(&self, request: CompletionRequest) -> Result<TextStream>;
}
