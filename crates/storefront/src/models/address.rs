//! Shipping addresses.

use serde::{Deserialize, Serialize};

use keylab_core::{AddressId, UserId};

/// Region used when none is given.
pub const DEFAULT_REGION: &str = "Región Metropolitana";

/// A saved shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    /// Label such as "Casa" or "Oficina".
    pub alias: String,
    pub street: String,
    pub number: String,
    pub apartment: Option<String>,
    pub commune: String,
    pub region: String,
    pub phone: String,
}

/// Address form input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAddress {
    pub alias: String,
    pub street: String,
    pub number: String,
    pub apartment: Option<String>,
    pub commune: String,
    pub region: Option<String>,
    pub phone: String,
}

impl NewAddress {
    /// Check required fields.
    ///
    /// # Errors
    ///
    /// Returns the name of the first blank required field.
    pub fn validate(&self) -> Result<(), String> {
        let required = [
            ("alias", &self.alias),
            ("street", &self.street),
            ("number", &self.number),
            ("commune", &self.commune),
            ("phone", &self.phone),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(format!("{field} is required"));
            }
        }
        Ok(())
    }

    /// Trim fields, drop a blank apartment, and fill in the default region.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            alias: self.alias.trim().to_string(),
            street: self.street.trim().to_string(),
            number: self.number.trim().to_string(),
            apartment: self
                .apartment
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
            commune: self.commune.trim().to_string(),
            region: Some(
                self.region
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            ),
            phone: self.phone.trim().to_string(),
        }
    }
}
