//! Provider endpoints: base URL, credentials and API flavor.

use std::fmt;

/// The default OpenAI API base.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// How a provider lays out URLs and authenticates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiFlavor {
    /// OpenAI and OpenAI-compatible APIs: `{base}/{operation}` with a bearer token,
    /// the model named in the request body.
    OpenAI,
    /// Azure OpenAI: `{endpoint}/openai/deployments/{deployment}/{operation}?api-version=…`
    /// with an `api-key` header.
    Azure {
        /// The `api-version` query parameter.
        api_version: String,
    },
}

/// A provider location plus the key used to call it.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiEndpoint {
    pub base_url: String,
    pub api_key: String,
    pub flavor: ApiFlavor,
}

impl ApiEndpoint {
    /// The public OpenAI API.
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::compatible(OPENAI_API_BASE, api_key)
    }

    /// Any OpenAI-compatible API (vLLM, Ollama, a local proxy).
    pub fn compatible(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), api_key: api_key.into(), flavor: ApiFlavor::OpenAI }
    }

    /// An Azure OpenAI resource.
    pub fn azure(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            base_url: endpoint.into(),
            api_key: api_key.into(),
            flavor: ApiFlavor::Azure { api_version: api_version.into() },
        }
    }

    /// Name used in logs and errors.
    pub fn provider_name(&self) -> &'static str {
        match self.flavor {
            ApiFlavor::OpenAI => "OpenAI",
            ApiFlavor::Azure { .. } => "AzureOpenAI",
        }
    }

    /// The base URL without a trailing slash.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

impl fmt::Debug for ApiEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiEndpoint")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("flavor", &self.flavor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn azure_endpoint_carries_version() {
        let endpoint = ApiEndpoint::azure("https://res.openai.azure.com/", "k", "2024-05-01-preview");
        assert_eq!(endpoint.base(), "https://res.openai.azure.com");
        assert_eq!(endpoint.provider_name(), "AzureOpenAI");
        assert_eq!(endpoint.flavor, ApiFlavor::Azure { api_version: "2024-05-01-preview".into() });
    }

    #[test]
    fn openai_uses_public_base() {
        let endpoint = ApiEndpoint::openai("sk-1");
        assert_eq!(endpoint.base(), OPENAI_API_BASE);
        assert_eq!(endpoint.provider_name(), "OpenAI");
    }

    #[test]
    fn debug_redacts_key() {
        let endpoint = ApiEndpoint::openai("sk-secret");
        assert!(!format!("{endpoint:?}").contains("sk-secret"));
    }
}
