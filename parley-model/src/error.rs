//! Configuration errors.

use thiserror::Error;

/// A backend cannot be constructed from the given configuration.
///
/// These are fatal at startup: the server refuses to serve requests without a
/// usable endpoint and credential.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting is absent.
    #[error("missing configuration: {0}")]
    Missing(String),

    /// A setting is present but unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
