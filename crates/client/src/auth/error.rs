//! Authentication error types.

use thiserror::Error;

use super::storage::StorageError;
use crate::api::ApiError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] campus_print_core::EmailError),

    /// A required field was left blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The backend rejected the request or could not be reached.
    #[error("auth request failed: {0}")]
    Api(#[from] ApiError),

    /// The session could not be persisted or cleared.
    #[error("session storage error: {0}")]
    Storage(#[from] StorageError),

    /// The user record could not be serialized for storage.
    #[error("failed to serialize session: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl AuthError {
    /// Returns true if the backend rejected the credentials.
    #[must_use]
    pub const fn is_invalid_credentials(&self) -> bool {
        matches!(
            self,
            Self::Api(ApiError::Status {
                status: 400 | 401 | 403,
                ..
            })
        )
    }
}
