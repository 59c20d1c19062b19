//! Top-level client error.

use thiserror::Error;

use crate::api::ApiError;
use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::store::OrderError;

/// Errors from [`crate::PrintClient`] operations that span several parts.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// The operation needs a signed-in user.
    #[error("not signed in")]
    NotSignedIn,
}
