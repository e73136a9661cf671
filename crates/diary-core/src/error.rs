//! Error types for diary-core

use thiserror::Error;

use crate::backend::{AuthError, StoreError};

/// Result type alias using diary-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in diary-core operations.
///
/// Every variant is scoped to the single action that raised it.
#[derive(Error, Debug)]
pub enum Error {
    /// Rejected user input; nothing was changed
    #[error("{0}")]
    Validation(String),

    /// Backend could not be reached or failed
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Backend refused the request
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Wrong unlock passphrase
    #[error("Wrong password!")]
    AuthorizationMismatch,

    /// Identity provider error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Note not found
    #[error("Note not found: {0}")]
    NotFound(String),

    /// Stored document did not have the expected shape
    #[error("Malformed document: {0}")]
    Malformed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StoreError> for Error {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::ServiceUnavailable(message) => Self::ServiceUnavailable(message),
            StoreError::PermissionDenied(message) => Self::PermissionDenied(message),
            StoreError::Malformed(message) => Self::Malformed(message),
        }
    }
}

impl Error {
    /// Network, auth or store failure, as opposed to rejected input.
    pub const fn is_service_error(&self) -> bool {
        matches!(
            self,
            Self::ServiceUnavailable(_)
                | Self::PermissionDenied(_)
                | Self::Auth(_)
                | Self::Malformed(_)
        )
    }
}
