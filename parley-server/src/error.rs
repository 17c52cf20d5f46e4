//! HTTP error responses.

use axum::{
    Json,
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use parley_chat::ChatError;
use parley_core::BackendError;
use parley_rag::RagError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Errors a handler can return; each renders as `{"error": message}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("File type not allowed. Use .txt or .pdf")]
    UnsupportedFile,

    #[error("{0}")]
    Extraction(String),

    #[error("File too large. Maximum size is 16MB")]
    PayloadTooLarge,

    #[error(transparent)]
    Backend(BackendError),

    #[error("{0}")]
    Internal(String),
}

/// `Ok` or an [`ApiError`] response.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// `"<Field> is required"`.
    pub fn required(field: &str) -> Self {
        Self::BadRequest(format!("{field} is required"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::UnsupportedFile => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Backend(BackendError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            Self::Backend(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Backend(e) => Self::Backend(e),
            ChatError::Parse(message) => Self::Internal(message),
        }
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::UnsupportedFileType { .. } => Self::UnsupportedFile,
            RagError::ExtractionError { .. } => Self::Extraction(err.to_string()),
            RagError::EmbeddingError(e) | RagError::CompletionError(e) => Self::Backend(e),
            RagError::ConfigError(_)
            | RagError::VectorStoreError { .. }
            | RagError::PersistenceError { .. } => Self::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge
        } else {
            Self::BadRequest(err.body_text())
        }
    }
}
