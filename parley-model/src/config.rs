//! Configuration for completion clients.

use std::time::Duration;

use parley_core::ApiEndpoint;

use crate::error::ConfigError;

/// Default per-request timeout for backend calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Where to send completions and how long to wait for them.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Provider location and credential.
    pub endpoint: ApiEndpoint,
    /// Model name, or deployment name on Azure.
    pub model: String,
    /// Deadline for a non-streaming call, and for each step of a streaming one.
    pub request_timeout: Duration,
}

impl ModelConfig {
    pub fn new(endpoint: ApiEndpoint, model: impl Into<String>) -> Self {
        Self { endpoint, model: model.into(), request_timeout: DEFAULT_REQUEST_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Check that the endpoint, key and model are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for an empty endpoint, key or model and
    /// [`ConfigError::Invalid`] for a non-HTTP endpoint or a zero timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.base_url.trim().is_empty() {
            return Err(ConfigError::Missing("endpoint URL".into()));
        }
        if !self.endpoint.base_url.starts_with("http://")
            && !self.endpoint.base_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid(format!(
                "endpoint URL must start with http:// or https://, got '{}'",
                self.endpoint.base_url
            )));
        }
        if self.endpoint.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("API key".into()));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::Missing("model or deployment name".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid("request timeout must be greater than zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_key() {
        let config = ModelConfig::new(ApiEndpoint::compatible("https://x", ""), "gpt-4o");
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let config = ModelConfig::new(ApiEndpoint::compatible("ftp://x", "k"), "gpt-4o");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn accepts_azure_endpoint() {
        let endpoint = ApiEndpoint::azure("https://res.openai.azure.com", "k", "2024-05-01-preview");
        assert!(ModelConfig::new(endpoint, "gpt-4o").validate().is_ok());
    }
}
