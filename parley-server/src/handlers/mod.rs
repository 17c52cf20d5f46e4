//! Route handlers.

pub mod chat;
pub mod documents;
pub mod health;
pub mod tasks;

use axum::http::HeaderMap;
use parley_chat::DEFAULT_SESSION_ID;

use crate::error::{ApiError, ApiResult};

/// Header selecting the conversation a chat request belongs to.
pub const SESSION_HEADER: &str = "x-session-id";

pub(crate) fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub(crate) fn session_id(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(DEFAULT_SESSION_ID)
        .to_string()
}

/// A present, non-blank string field.
pub(crate) fn require(value: Option<String>, field: &str) -> ApiResult<String> {
    value.filter(|v| !v.trim().is_empty()).ok_or_else(|| ApiError::required(field))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn session_header_defaults() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_id(&headers), "default");
        headers.insert(SESSION_HEADER, HeaderValue::from_static("  "));
        assert_eq!(session_id(&headers), "default");
        headers.insert(SESSION_HEADER, HeaderValue::from_static("alice"));
        assert_eq!(session_id(&headers), "alice");
    }

    #[test]
    fn blank_fields_are_missing() {
        assert!(require(None, "Text").is_err());
        assert!(require(Some("   ".into()), "Text").is_err());
        assert_eq!(require(Some("hi".into()), "Text").unwrap(), "hi");
    }
}
