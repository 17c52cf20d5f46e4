//! # parley-model
//!
//! Completion backends for Parley.
//!
//! ## Overview
//!
//! - [`OpenAIClient`] — Azure OpenAI deployments and OpenAI-compatible APIs via
//!   `async-openai`, with streaming and token-usage logging
//! - [`ApiClient`] — the `async-openai` client per API flavor, shared with the
//!   embedding provider
//! - [`RetryingBackend`] — wraps any [`CompletionBackend`](parley_core::CompletionBackend)
//!   with a [`RetryPolicy`](parley_core::RetryPolicy)
//! - [`credentials`] — API key resolution from the environment or Azure Key Vault
//! - [`MockBackend`] — scripted backend for tests and offline runs
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use parley_core::ApiEndpoint;
//! use parley_model::{ModelConfig, OpenAIClient};
//!
//! let endpoint = ApiEndpoint::azure(
//!     "https://my-resource.openai.azure.com",
//!     std::env::var("AZURE_OPENAI_API_KEY")?,
//!     "2024-05-01-preview",
//! );
//! let client = OpenAIClient::new(ModelConfig::new(endpoint, "gpt-4o"))?;
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod mock;
pub mod retry;

pub use api::ApiClient;
pub use client::OpenAIClient;
pub use config::ModelConfig;
pub use credentials::{
    ChainedCredentialProvider, CredentialProvider, EnvCredentialProvider,
    KeyVaultCredentialProvider, StaticCredentialProvider,
};
pub use error::ConfigError;
pub use mock::{MockBackend, MockReply};
pub use retry::RetryingBackend;
