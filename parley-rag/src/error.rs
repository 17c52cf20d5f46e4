//! Error types for the `parley-rag` crate.

use parley_core::BackendError;
use thiserror::Error;

/// Errors that can occur while ingesting or retrieving documents.
#[derive(Debug, Error)]
pub enum RagError {
    /// The file extension is neither `pdf` nor `txt`.
    #[error("Unsupported file type: {extension}")]
    UnsupportedFileType {
        /// The rejected extension (empty when the name has none).
        extension: String,
    },

    /// The document could not be read or its text could not be extracted.
    #[error("Extraction error ({file}): {message}")]
    ExtractionError {
        /// The file being processed.
        file: String,
        /// A description of the failure.
        message: String,
    },

    /// The embedding backend failed.
    #[error("Embedding error: {0}")]
    EmbeddingError(#[from] BackendError),

    /// The completion backend failed while composing an answer.
    #[error("Completion error: {0}")]
    CompletionError(BackendError),

    /// The index rejected an upsert or query, e.g. on a dimension mismatch.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// Which index implementation failed.
        backend: String,
        message: String,
    },

    /// Saving or loading a snapshot failed.
    #[error("Persistence error ({path}): {message}")]
    PersistenceError {
        /// The file or directory involved.
        path: String,
        /// A description of the failure.
        message: String,
    },

    /// Settings that violate an invariant, or a provider that cannot be built.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result alias used throughout `parley-rag`.
pub type Result<T> = std::result::Result<T, RagError>;
