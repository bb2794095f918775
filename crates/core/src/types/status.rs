//! Status enums for various entities.

use serde::{Deserialize, Serialize};

/// Order status.
///
/// Checkout only creates orders after the payment step approved them, and
/// orders are never mutated afterwards, so every order is `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Completed,
}

impl OrderStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(Self::Completed),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_through_str() {
        let status = OrderStatus::default();
        assert_eq!(status.to_string(), "completed");
        assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
    }

    #[test]
    fn test_unknown_status() {
        assert!("shipped".parse::<OrderStatus>().is_err());
    }
}
