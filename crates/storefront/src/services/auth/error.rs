//! Authentication error types.

use thiserror::Error;

use keylab_core::{EmailError, PasswordError};

use crate::backend::RemoteError;
use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(#[from] PasswordError),

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// Registration without a name.
    #[error("name is required")]
    EmptyName,

    /// The backend refused the request with a client error.
    #[error("rejected by backend: {0}")]
    Rejected(String),

    /// The backend could not be reached or failed.
    #[error("remote error: {0}")]
    Remote(RemoteError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Whether this failure is ours rather than the user's.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Remote(_) | Self::Repository(_) | Self::PasswordHash
        )
    }
}

impl From<RemoteError> for AuthError {
    /// Client errors from the auth API are the user's problem (bad password,
    /// unconfirmed email, duplicate sign-up); everything else is ours.
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Status { status, message } if (400..500).contains(&status) => {
                Self::Rejected(message)
            }
            other => Self::Remote(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_status_becomes_rejected() {
        let err = AuthError::from(RemoteError::Status {
            status: 400,
            message: "Invalid login credentials".to_string(),
        });
        assert!(matches!(err, AuthError::Rejected(ref m) if m == "Invalid login credentials"));
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_server_status_stays_remote() {
        let err = AuthError::from(RemoteError::Status {
            status: 502,
            message: "bad gateway".to_string(),
        });
        assert!(matches!(err, AuthError::Remote(_)));
        assert!(err.is_server_error());
    }
}
