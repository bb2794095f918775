//! Password rules shared by registration and login forms.

use thiserror::Error;

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Errors returned by [`validate_password`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordError {
    /// The password is empty.
    #[error("password cannot be empty")]
    Empty,
    /// The password is shorter than [`MIN_PASSWORD_LENGTH`].
    #[error("password must be at least {min} characters")]
    TooShort {
        /// Required minimum length.
        min: usize,
    },
}

/// Validate a password.
///
/// Length is counted in characters, spaces included. There is no upper bound.
///
/// # Errors
///
/// Returns `PasswordError::Empty` or `PasswordError::TooShort`.
pub fn validate_password(password: &str) -> Result<(), PasswordError> {
    let len = password.chars().count();
    if len == 0 {
        return Err(PasswordError::Empty);
    }
    if len < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::TooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(())
}

/// Shorthand for `validate_password(s).is_ok()`.
#[must_use]
pub fn is_valid_password(password: &str) -> bool {
    validate_password(password).is_ok()
}
