//! Authentication error types.

use thiserror::Error;

use crate::identity::IdentityError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] plated_core::EmailError),

    /// Password was empty.
    #[error("password is required")]
    MissingPassword,

    /// Invalid credentials (wrong password or unknown email).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The identity provider refused the request.
    #[error("{0}")]
    Rejected(String),

    /// The identity provider failed.
    #[error("identity provider error: {0}")]
    Provider(IdentityError),
}

impl From<IdentityError> for AuthError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredentials => Self::InvalidCredentials,
            IdentityError::Rejected(message) => Self::Rejected(message),
            other => Self::Provider(other),
        }
    }
}
