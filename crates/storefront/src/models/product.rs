//! Catalog product types.

use serde::{Deserialize, Serialize};

use keylab_core::{Price, ProductId};

/// A catalog product, as mirrored in the local cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Backend-assigned ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: Price,
    /// Category, e.g. "Teclados".
    pub category: String,
    /// Optional subcategory.
    pub subcategory: Option<String>,
    /// Optional long description.
    pub description: Option<String>,
    /// Units in stock.
    pub stock: i32,
    /// Absolute image URL, if any.
    pub image_url: Option<String>,
    /// Backend creation timestamp, verbatim.
    pub created_at: Option<String>,
    /// Backend update timestamp, verbatim.
    pub updated_at: Option<String>,
}

impl Product {
    /// Whether at least one unit is in stock.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Editable product fields, used by admin create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    pub price: Price,
    pub category: String,
    pub subcategory: Option<String>,
    pub description: Option<String>,
    pub stock: i32,
    pub image_url: Option<String>,
}

impl ProductDraft {
    /// Check the fields an admin form would reject.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("product name cannot be empty".to_string());
        }
        if self.category.trim().is_empty() {
            return Err("product category cannot be empty".to_string());
        }
        if self.price.is_negative() {
            return Err("product price cannot be negative".to_string());
        }
        if self.stock < 0 {
            return Err("product stock cannot be negative".to_string());
        }
        Ok(())
    }

    /// Blank optional strings become `None`.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.category = self.category.trim().to_string();
        self.subcategory = non_blank(self.subcategory);
        self.description = non_blank(self.description);
        self.image_url = non_blank(self.image_url);
        self
    }
}

impl From<&Product> for ProductDraft {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            price: product.price,
            category: product.category.clone(),
            subcategory: product.subcategory.clone(),
            description: product.description.clone(),
            stock: product.stock,
            image_url: product.image_url.clone(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ProductDraft {
        ProductDraft {
            name: "Teclado 75%".to_string(),
            price: Price::from_whole(45_000),
            category: "Teclados".to_string(),
            subcategory: Some("  ".to_string()),
            description: None,
            stock: 3,
            image_url: Some(String::new()),
        }
    }

    #[test]
    fn test_validate_accepts_complete_draft() {
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        let mut d = draft();
        d.name = "   ".to_string();
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_stock_and_price() {
        let mut d = draft();
        d.stock = -1;
        assert!(d.validate().is_err());

        let mut d = draft();
        d.price = Price::from_whole(-5);
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_normalized_drops_blank_optionals() {
        let d = draft().normalized();
        assert_eq!(d.subcategory, None);
        assert_eq!(d.image_url, None);
    }
}
