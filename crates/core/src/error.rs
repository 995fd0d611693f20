//! Error types for Nexus.
//!
//! This module defines a unified error enum covering configuration, I/O,
//! embedding, generation, index and prompt failures. An empty corpus is not an
//! error: it is reported as `Ok(None)` by the operations that can observe it.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for Nexus.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid configuration (chunk parameters, unknown providers, personas).
    /// Raised at startup and never recovered from.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The embedding capability failed (network, quota, malformed response)
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// The generation capability failed (network, quota, malformed response)
    #[error("Generation error: {0}")]
    Generation(String),

    /// Persisted index could not be read or written
    #[error("Index error: {0}")]
    Index(String),

    /// The previous index could not be discarded, or another writer holds it.
    #[error(
        "Index write conflict at {path:?}: {reason}. Manual intervention needed: \
         stop other Nexus processes or delete the index directory, then rebuild."
    )]
    IndexWriteConflict { path: PathBuf, reason: String },

    /// The persisted index was built with a different embedder than the one
    /// configured for queries.
    #[error("Embedding space mismatch: index was built with '{found}', current embedder is '{expected}'")]
    EmbeddingSpaceMismatch { expected: String, found: String },

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
