//! Human-facing order numbers (`ORD-1A2B3C4D`).

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Prefix shared by every order number.
const PREFIX: &str = "ORD-";

/// Number of characters after the prefix.
const SUFFIX_LEN: usize = 8;

/// Errors that can occur when parsing an [`OrderNumber`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderNumberError {
    /// The value does not start with `ORD-`.
    #[error("order number must start with {PREFIX}")]
    MissingPrefix,
    /// The suffix is not eight uppercase hexadecimal characters.
    #[error("order number suffix must be {SUFFIX_LEN} uppercase hex characters")]
    InvalidSuffix,
}

/// An order number: `ORD-` followed by the first eight characters of a random
/// UUID, uppercased.
///
/// Numbers are random, not sequential, and are not guaranteed unique; the
/// order's database ID is the real key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Generate a fresh order number.
    #[must_use]
    pub fn generate() -> Self {
        let uuid = Uuid::new_v4().simple().to_string();
        let suffix: String = uuid.chars().take(SUFFIX_LEN).collect();
        Self(format!("{PREFIX}{}", suffix.to_uppercase()))
    }

    /// Parse an existing order number.
    ///
    /// # Errors
    ///
    /// Returns `OrderNumberError` if the value is not `ORD-` followed by eight
    /// uppercase hex characters.
    pub fn parse(s: &str) -> Result<Self, OrderNumberError> {
        let suffix = s.strip_prefix(PREFIX).ok_or(OrderNumberError::MissingPrefix)?;
        let valid = suffix.len() == SUFFIX_LEN
            && suffix
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c));
        if !valid {
            return Err(OrderNumberError::InvalidSuffix);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for OrderNumber {
    type Err = OrderNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = OrderNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OrderNumber> for String {
    fn from(number: OrderNumber) -> Self {
        number.0
    }
}
