//! API key resolution.
//!
//! A [`CredentialProvider`] returns `None` when it has nothing to offer, so
//! providers can be chained: [`ChainedCredentialProvider`] asks each in turn
//! and stops at the first key. The usual production chain is Azure Key Vault
//! first, then the `AZURE_OPENAI_API_KEY` environment variable.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::ConfigError;

/// Name of the Key Vault secret holding the model API key.
pub const DEFAULT_SECRET_NAME: &str = "openai-api-key";

const KEY_VAULT_RESOURCE: &str = "https://vault.azure.net";
const KEY_VAULT_API_VERSION: &str = "7.4";
const IMDS_TOKEN_URL: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const KEY_VAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A source of API keys.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// A short name used in logs.
    fn name(&self) -> &str;

    /// Resolve a key, or `None` when this source has none.
    async fn resolve(&self) -> Option<String>;
}

/// Reads a key from an environment variable. Empty values count as absent.
#[derive(Debug, Clone)]
pub struct EnvCredentialProvider {
    var: String,
}

impl EnvCredentialProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentialProvider {
    fn name(&self) -> &str {
        &self.var
    }

    async fn resolve(&self) -> Option<String> {
        std::env::var(&self.var).ok().filter(|value| !value.trim().is_empty())
    }
}

/// A key known up front (e.g. already read from configuration).
#[derive(Clone, Default)]
pub struct StaticCredentialProvider {
    key: Option<String>,
}

impl StaticCredentialProvider {
    pub fn new(key: Option<String>) -> Self {
        Self { key: key.filter(|k| !k.trim().is_empty()) }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    fn name(&self) -> &str {
        "static"
    }

    async fn resolve(&self) -> Option<String> {
        self.key.clone()
    }
}

/// Fetches the key from Azure Key Vault using the host's managed identity.
///
/// On App Service the token comes from `IDENTITY_ENDPOINT`/`IDENTITY_HEADER`;
/// elsewhere from the instance metadata service. Any failure is logged and
/// reported as `None`.
pub struct KeyVaultCredentialProvider {
    client: reqwest::Client,
    vault_url: String,
    secret_name: String,
}

impl KeyVaultCredentialProvider {
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] when `vault_url` is not an `https://` URL or the
    /// HTTP client cannot be built.
    pub fn new(vault_url: impl Into<String>) -> Result<Self, ConfigError> {
        let vault_url = vault_url.into();
        if !vault_url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "Key Vault URL must start with https://, got '{vault_url}'"
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(KEY_VAULT_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build Key Vault client: {e}")))?;
        Ok(Self { client, vault_url, secret_name: DEFAULT_SECRET_NAME.to_string() })
    }

    pub fn with_secret_name(mut self, name: impl Into<String>) -> Self {
        self.secret_name = name.into();
        self
    }

    async fn access_token(&self) -> Result<String, String> {
        let request = match (std::env::var("IDENTITY_ENDPOINT"), std::env::var("IDENTITY_HEADER")) {
            (Ok(endpoint), Ok(header)) => self
                .client
                .get(format!("{endpoint}?resource={KEY_VAULT_RESOURCE}&api-version=2019-08-01"))
                .header("X-IDENTITY-HEADER", header),
            _ => self
                .client
                .get(format!("{IMDS_TOKEN_URL}?resource={KEY_VAULT_RESOURCE}&api-version=2018-02-01"))
                .header("Metadata", "true"),
        };

        let response = request.send().await.map_err(|e| format!("token request failed: {e}"))?;
        if !response.status().is_success() {
            return Err(format!("token endpoint returned {}", response.status()));
        }
        let token: TokenResponse =
            response.json().await.map_err(|e| format!("invalid token response: {e}"))?;
        Ok(token.access_token)
    }

    async fn fetch_secret(&self) -> Result<String, String> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/secrets/{}?api-version={KEY_VAULT_API_VERSION}",
            self.vault_url.trim_end_matches('/'),
            self.secret_name
        );
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| format!("secret request failed: {e}"))?;
        if !response.status().is_success() {
            return Err(format!("Key Vault returned {}", response.status()));
        }
        let secret: SecretResponse =
            response.json().await.map_err(|e| format!("invalid secret response: {e}"))?;
        Ok(secret.value)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct SecretResponse {
    value: String,
}

#[async_trait]
impl CredentialProvider for KeyVaultCredentialProvider {
    fn name(&self) -> &str {
        "key-vault"
    }

    async fn resolve(&self) -> Option<String> {
        match self.fetch_secret().await {
            Ok(value) if !value.trim().is_empty() => Some(value),
            Ok(_) => {
                warn!(vault = %self.vault_url, secret = %self.secret_name, "Key Vault secret is empty");
                None
            }
            Err(e) => {
                warn!(vault = %self.vault_url, error = %e, "failed to retrieve from Key Vault");
                None
            }
        }
    }
}

/// Tries each provider in order and returns the first key found.
#[derive(Default, Clone)]
pub struct ChainedCredentialProvider {
    providers: Vec<Arc<dyn CredentialProvider>>,
}

impl ChainedCredentialProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.providers.push(provider);
        self
    }
}

#[async_trait]
impl CredentialProvider for ChainedCredentialProvider {
    fn name(&self) -> &str {
        "chain"
    }

    async fn resolve(&self) -> Option<String> {
        for provider in &self.providers {
            if let Some(key) = provider.resolve().await {
                info!(source = provider.name(), "resolved API key");
                return Some(key);
            }
            debug!(source = provider.name(), "no API key from source");
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn chain_falls_back_to_next_source() {
        let chain = ChainedCredentialProvider::new()
            .with(Arc::new(StaticCredentialProvider::new(None)))
            .with(Arc::new(StaticCredentialProvider::new(Some("from-second".into()))));
        assert_eq!(chain.resolve().await.as_deref(), Some("from-second"));
    }

    #[tokio::test]
    async fn empty_static_key_is_absent() {
        assert_eq!(StaticCredentialProvider::new(Some("  ".into())).resolve().await, None);
    }

    #[tokio::test]
    async fn empty_chain_resolves_nothing() {
        assert_eq!(ChainedCredentialProvider::new().resolve().await, None);
    }

    #[test]
    fn key_vault_url_must_be_https() {
        let err = KeyVaultCredentialProvider::new("vault.example.net").err().unwrap();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("https://")));

        let provider = KeyVaultCredentialProvider::new("https://parley.vault.azure.net")
            .unwrap()
            .with_secret_name("chat-key");
        assert_eq!(provider.secret_name, "chat-key");
        assert_eq!(provider.name(), "key-vault");
    }

    #[tokio::test]
    async fn unset_env_var_is_absent() {
        let provider = EnvCredentialProvider::new("PARLEY_TEST_SURELY_UNSET_VARIABLE");
        assert_eq!(provider.resolve().await, None);
    }
}
