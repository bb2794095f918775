//! Tagged result of a long-running operation, as observed by subscribers.

use serde::{Deserialize, Serialize};

/// State of an operation that a front end may be watching.
///
/// `Pending` is published when the operation starts; it is then replaced by
/// `Success` or `Error`. Front ends render the error string as-is.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Outcome<T> {
    /// Nothing has run yet, or a run is in progress.
    #[default]
    Pending,
    /// The last run succeeded.
    Success(T),
    /// The last run failed with a user-facing message.
    Error(String),
}

impl<T> Outcome<T> {
    /// Whether this is `Pending`.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Whether this is `Success`.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The error message, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Map the success value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Pending => Outcome::Pending,
            Self::Success(value) => Outcome::Success(f(value)),
            Self::Error(message) => Outcome::Error(message),
        }
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for Outcome<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(e) => Self::Error(e.to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_pending() {
        assert!(Outcome::<u32>::default().is_pending());
    }

    #[test]
    fn test_from_result() {
        let ok: Outcome<u32> = Ok::<_, String>(3).into();
        assert_eq!(ok, Outcome::Success(3));

        let err: Outcome<u32> = Err::<u32, _>("boom").into();
        assert_eq!(err.error_message(), Some("boom"));
    }

    #[test]
    fn test_map_keeps_error() {
        let err: Outcome<u32> = Outcome::Error("x".to_string());
        assert_eq!(err.map(|n| n * 2), Outcome::Error("x".to_string()));
        assert_eq!(Outcome::Success(2).map(|n| n * 2), Outcome::Success(4));
    }

    #[test]
    fn test_serde_tagged() {
        let json = serde_json::to_value(Outcome::Success(5)).unwrap();
        assert_eq!(json, serde_json::json!({"state": "success", "value": 5}));
    }
}
