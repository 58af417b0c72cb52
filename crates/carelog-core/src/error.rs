//! Error types for carelog-core

use thiserror::Error;

/// Result type alias using carelog-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in local carelog-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested row does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error taxonomy surfaced by the sync engine.
///
/// Collaborators (local stores, remote stores, mappers) report failures in
/// these kinds so the orchestrator can decide whether a pass is worth
/// retrying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Remote store unreachable or timed out
    #[error("Network error: {0}")]
    Network(String),

    /// A required row or mapping is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed record or document
    #[error("Validation error: {0}")]
    Validation(String),

    /// Local store failure
    #[error("Database error: {0}")]
    Database(String),

    /// Auth/session is no longer valid
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Anything else
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl DomainError {
    /// Whether re-running the same pass can reasonably succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Database(_) | Self::Unknown(_)
        )
    }
}

impl From<Error> for DomainError {
    fn from(error: Error) -> Self {
        match error {
            Error::NotFound(message) => Self::NotFound(message),
            Error::InvalidInput(message) => Self::Validation(message),
            Error::Serialization(error) => Self::Validation(error.to_string()),
            error @ (Error::Database(_) | Error::LibSql(_) | Error::Io(_)) => {
                Self::Database(error.to_string())
            }
        }
    }
}
