//! Server configuration loaded from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use parley_model::{
    ChainedCredentialProvider, ConfigError, CredentialProvider, KeyVaultCredentialProvider,
    StaticCredentialProvider,
};
use parley_rag::RagConfig;
use parley_telemetry::LogFormat;

const DEFAULT_API_VERSION: &str = "2024-05-01-preview";
const DEFAULT_DEPLOYMENT: &str = "gpt-4o";
const DEFAULT_EMBEDDING_DEPLOYMENT: &str = "text-embedding-ada-002";

/// Everything the `parley` binary needs to start.
#[derive(Clone)]
pub struct AppConfig {
    pub endpoint: String,
    /// Key from the environment; Key Vault, when configured, takes precedence.
    pub api_key: Option<String>,
    pub api_version: String,
    pub deployment: String,
    pub embedding_deployment: String,
    pub key_vault_url: Option<String>,
    pub host: String,
    pub port: u16,
    /// Deadline for each backend HTTP call.
    pub request_timeout: Duration,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub history_exchanges: usize,
    /// Directory for index snapshots; unset keeps the index in memory only.
    pub index_path: Option<PathBuf>,
    pub verify_on_startup: bool,
    pub log_format: LogFormat,
    /// The `.env` file that was loaded, if any.
    pub env_file: Option<PathBuf>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_version", &self.api_version)
            .field("deployment", &self.deployment)
            .field("embedding_deployment", &self.embedding_deployment)
            .field("key_vault_url", &self.key_vault_url)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("request_timeout", &self.request_timeout)
            .field("index_path", &self.index_path)
            .field("env_file", &self.env_file)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Load `.env` (if present) and read the process environment.
    ///
    /// Runs before logging is set up, so the loaded file is recorded in
    /// [`env_file`](Self::env_file) rather than logged.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_file = dotenvy::dotenv().ok();
        let mut config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.env_file = env_file;
        Ok(config)
    }

    /// Build a config from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Missing`] without `AZURE_OPENAI_ENDPOINT`;
    /// [`ConfigError::Invalid`] for unparseable numbers or flags, a zero
    /// timeout or history length, or inconsistent chunking settings.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let endpoint = get("AZURE_OPENAI_ENDPOINT")
            .ok_or_else(|| ConfigError::Missing("AZURE_OPENAI_ENDPOINT".into()))?;

        let config = Self {
            endpoint,
            api_key: get("AZURE_OPENAI_API_KEY"),
            api_version: get("AZURE_OPENAI_API_VERSION").unwrap_or_else(|| DEFAULT_API_VERSION.into()),
            deployment: get("AZURE_OPENAI_DEPLOYMENT_NAME").unwrap_or_else(|| DEFAULT_DEPLOYMENT.into()),
            embedding_deployment: get("AZURE_OPENAI_EMBEDDING_DEPLOYMENT")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_DEPLOYMENT.into()),
            key_vault_url: get("AZURE_KEY_VAULT_URL"),
            host: get("PARLEY_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(get("PARLEY_PORT"), "PARLEY_PORT", 8000)?,
            request_timeout: Duration::from_secs(parse_or(
                get("PARLEY_REQUEST_TIMEOUT_SECS"),
                "PARLEY_REQUEST_TIMEOUT_SECS",
                60,
            )?),
            chunk_size: parse_or(get("PARLEY_CHUNK_SIZE"), "PARLEY_CHUNK_SIZE", 1000)?,
            chunk_overlap: parse_or(get("PARLEY_CHUNK_OVERLAP"), "PARLEY_CHUNK_OVERLAP", 200)?,
            history_exchanges: parse_or(get("PARLEY_HISTORY_EXCHANGES"), "PARLEY_HISTORY_EXCHANGES", 10)?,
            index_path: get("PARLEY_INDEX_PATH").map(PathBuf::from),
            verify_on_startup: parse_flag(get("PARLEY_VERIFY_ON_STARTUP"), "PARLEY_VERIFY_ON_STARTUP", true)?,
            log_format: match get("PARLEY_LOG_FORMAT") {
                Some(value) => value.parse().map_err(ConfigError::Invalid)?,
                None => LogFormat::default(),
            },
            env_file: None,
        };

        if config.request_timeout.is_zero() {
            return Err(ConfigError::Invalid("PARLEY_REQUEST_TIMEOUT_SECS must be positive".into()));
        }
        if config.history_exchanges == 0 {
            return Err(ConfigError::Invalid("PARLEY_HISTORY_EXCHANGES must be positive".into()));
        }
        config.rag_config()?;
        Ok(config)
    }

    /// Chunking settings as a validated [`RagConfig`].
    pub fn rag_config(&self) -> Result<RagConfig, ConfigError> {
        RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .build()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("invalid host/port {}:{}: {e}", self.host, self.port)))
    }

    /// Overall deadline for one HTTP request: room for every retried backend call.
    pub fn server_timeout(&self) -> Duration {
        self.request_timeout.saturating_mul(3) + Duration::from_secs(10)
    }

    /// Resolve the API key: Key Vault first (when configured), then the environment.
    pub async fn resolve_api_key(&self) -> Result<String, ConfigError> {
        let mut chain = ChainedCredentialProvider::new();
        if let Some(vault) = &self.key_vault_url {
            chain = chain.with(Arc::new(KeyVaultCredentialProvider::new(vault.clone())?));
        }
        chain = chain.with(Arc::new(StaticCredentialProvider::new(self.api_key.clone())));

        chain.resolve().await.ok_or_else(|| ConfigError::Missing("AZURE_OPENAI_API_KEY".into()))
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("{key} has an invalid value '{raw}'"))),
    }
}

fn parse_flag(value: Option<String>, key: &str, default: bool) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::Invalid(format!("{key} must be true or false, got '{other}'"))),
    }
}
