//! # parley-core
//!
//! Shared building blocks for the Parley crates.
//!
//! ## Overview
//!
//! - [`Message`] / [`Role`] — chat messages exchanged with a completion backend
//! - [`CompletionRequest`] — messages plus sampling parameters
//! - [`CompletionBackend`] — the async seam every model provider implements
//! - [`BackendError`] — transport, status, timeout and decoding failures
//! - [`ApiEndpoint`] — where a provider lives and how it authenticates
//!   (OpenAI-style or Azure OpenAI deployments)
//! - [`RetryPolicy`] — bounded exponential backoff for transient backend failures

pub mod backend;
pub mod endpoint;
pub mod error;
pub mod message;
pub mod retry;

pub use backend::{CompletionBackend, TextStream};
pub use endpoint::{ApiEndpoint, ApiFlavor};
pub use error::{BackendError, Result};
pub use message::{CompletionRequest, Message, Role};
pub use retry::RetryPolicy;
