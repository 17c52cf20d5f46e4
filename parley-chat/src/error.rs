//! Error types for the `parley-chat` crate.

use parley_core::BackendError;
use thiserror::Error;

/// Errors produced by conversations and single-shot tasks.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ChatError {
    /// The completion backend failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The model's reply did not match the expected structure.
    #[error("Failed to parse model output: {0}")]
    Parse(String),
}

impl ChatError {
    /// Whether the underlying failure was a backend timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Backend(BackendError::Timeout { .. }))
    }
}

/// A convenience result type for chat operations.
pub type Result<T> = std::result::Result<T, ChatError>;
