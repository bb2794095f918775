//! Unified error handling with Sentry integration.
//!
//! Every service returns `Result<T, AppError>`. Front ends show
//! [`AppError::user_message`] to the user and call [`AppError::report`] so
//! that failures on our side reach Sentry.

use thiserror::Error;

use crate::backend::RemoteError;
use crate::db::RepositoryError;
use crate::services::auth::AuthError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Local cache operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Backend call failed.
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Input rejected before any I/O.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The signed-in user may not do this.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The operation needs a signed-in user.
    #[error("Not logged in")]
    NotLoggedIn,

    /// Checkout with nothing in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// The simulated payment step rejected the card.
    #[error("Payment declined")]
    PaymentDeclined,

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this failure is ours rather than the user's.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        match self {
            Self::Database(_) | Self::Remote(_) | Self::Internal(_) => true,
            Self::Auth(err) => err.is_server_error(),
            _ => false,
        }
    }

    /// Log and capture server-side failures to Sentry. Does nothing for
    /// user errors.
    pub fn report(&self) {
        if !self.is_server_error() {
            return;
        }
        let event_id = sentry::capture_error(self);
        tracing::error!(
            error = %self,
            sentry_event_id = %event_id,
            "Operation failed"
        );
    }

    /// Message safe to show to the user.
    ///
    /// Internal details are never exposed.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "Something went wrong, please try again".to_string(),
            Self::Remote(err) => remote_message(err),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid email or password".to_string(),
                AuthError::UserAlreadyExists => {
                    "An account with this email already exists".to_string()
                }
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::WeakPassword(e) => e.to_string(),
                AuthError::PasswordMismatch => "Passwords do not match".to_string(),
                AuthError::EmptyName => "Name is required".to_string(),
                AuthError::Rejected(msg) => msg.clone(),
                AuthError::Remote(e) => remote_message(e),
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    "Authentication error".to_string()
                }
            },
            Self::NotLoggedIn => "Please log in first".to_string(),
            Self::EmptyCart => "Your cart is empty".to_string(),
            Self::PaymentDeclined => "Payment declined, please use another card".to_string(),
            Self::Validation(msg) | Self::NotFound(msg) | Self::Forbidden(msg) => msg.clone(),
        }
    }
}

fn remote_message(err: &RemoteError) -> String {
    match err {
        RemoteError::Http(e) if e.is_timeout() => "The server took too long to respond".to_string(),
        RemoteError::Http(_) => "Network error, check your connection".to_string(),
        RemoteError::Status { status, .. } => format!("Server error (HTTP {status})"),
        RemoteError::EmptyResponse => "The server returned an empty response".to_string(),
        RemoteError::Parse(_) => "The server returned an unexpected response".to_string(),
        RemoteError::InvalidUrl(_) => "Something went wrong, please try again".to_string(),
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added product", Some(&[("product_id", "12")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product 123".to_string());
        assert_eq!(err.to_string(), "Not found: product 123");

        let err = AppError::Validation("name is required".to_string());
        assert_eq!(err.to_string(), "Validation error: name is required");
    }

    #[test]
    fn test_user_messages_hide_internals() {
        let err = AppError::Database(RepositoryError::DataCorruption("bad price".to_string()));
        assert!(!err.user_message().contains("bad price"));

        let err = AppError::Remote(RemoteError::Status {
            status: 503,
            message: "upstream connect error".to_string(),
        });
        assert_eq!(err.user_message(), "Server error (HTTP 503)");

        let err = AppError::Remote(RemoteError::EmptyResponse);
        assert_eq!(err.user_message(), "The server returned an empty response");
    }

    #[test]
    fn test_bad_credentials_message() {
        assert_eq!(
            AppError::Auth(AuthError::InvalidCredentials).user_message(),
            "Invalid email or password"
        );
    }

    #[test]
    fn test_user_errors_are_not_server_errors() {
        assert!(!AppError::EmptyCart.is_server_error());
        assert!(!AppError::PaymentDeclined.is_server_error());
        assert!(!AppError::Auth(AuthError::InvalidCredentials).is_server_error());
        assert!(AppError::Internal("x".to_string()).is_server_error());
        assert!(AppError::Remote(RemoteError::EmptyResponse).is_server_error());
    }

    #[test]
    fn test_passthrough_messages() {
        assert_eq!(
            AppError::Forbidden("admin only".to_string()).user_message(),
            "admin only"
        );
        assert_eq!(AppError::NotLoggedIn.user_message(), "Please log in first");
    }
}
