//! Error types for model and embedding backends.

use thiserror::Error;

/// Errors raised by a completion or embedding backend.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BackendError {
    /// The request never produced an HTTP response (DNS, TLS, connection reset).
    #[error("{provider} request failed: {message}")]
    Transport {
        /// The backend that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The backend answered with a non-success status (auth, quota, server error).
    #[error("{provider} returned {status}: {message}")]
    Status {
        /// The backend that produced the error.
        provider: String,
        /// The HTTP status code.
        status: u16,
        /// The error detail reported by the backend.
        message: String,
    },

    /// The backend rejected the request with a structured error body.
    ///
    /// `code` is whatever the provider put in the body: Azure sends the HTTP
    /// status as a string (`"429"`), OpenAI a symbolic code (`"rate_limit_exceeded"`).
    #[error("{provider} rejected the request: {message}")]
    Api {
        /// The backend that produced the error.
        provider: String,
        /// The provider's error code, if any.
        code: Option<String>,
        /// The error detail reported by the backend.
        message: String,
    },

    /// The request exceeded its deadline.
    #[error("{provider} request timed out after {seconds}s")]
    Timeout {
        /// The backend that produced the error.
        provider: String,
        /// The configured timeout.
        seconds: u64,
    },

    /// The response body did not have the expected shape.
    #[error("{provider} response could not be decoded: {message}")]
    Decode {
        /// The backend that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The backend answered successfully but with no content.
    #[error("{provider} returned an empty response")]
    EmptyResponse {
        /// The backend that produced the error.
        provider: String,
    },
}

impl BackendError {
    /// Whether retrying the same request may succeed.
    ///
    /// Transport failures, timeouts, `408`, `429` and `5xx` statuses are transient,
    /// as are API errors whose code names one of those statuses or a rate limit.
    /// Authentication failures, bad requests and malformed responses are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => true,
            Self::Status { status, .. } => transient_status(*status),
            Self::Api { code: Some(code), .. } => match code.parse::<u16>() {
                Ok(status) => transient_status(status),
                Err(_) => matches!(code.as_str(), "rate_limit_exceeded" | "server_error"),
            },
            Self::Api { code: None, .. } | Self::Decode { .. } | Self::EmptyResponse { .. } => {
                false
            }
        }
    }

    /// The backend that produced this error.
    pub fn provider(&self) -> &str {
        match self {
            Self::Transport { provider, .. }
            | Self::Status { provider, .. }
            | Self::Api { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::Decode { provider, .. }
            | Self::EmptyResponse { provider } => provider,
        }
    }
}

fn transient_status(status: u16) -> bool {
    matches!(status, 408 | 429) || status >= 500
}

/// A convenience result type for backend calls.
pub type Result<T> = std::result::Result<T, BackendError>;
