//! Local cart types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keylab_core::{CartTotals, Price, ProductId};

/// One cart row: a snapshot of the product taken when it was first added,
/// plus a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product this row refers to (unique within the cart).
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub category: String,
    pub image_url: Option<String>,
    /// Always at least 1; rows at zero are deleted.
    pub quantity: u32,
    /// When the product was first added.
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// `price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.line_total(self.quantity)
    }
}

/// Cart contents with derived totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSummary {
    /// Rows, most recently added first.
    pub items: Vec<CartItem>,
    /// Subtotal, shipping, and total.
    pub totals: CartTotals,
}

impl CartSummary {
    /// Build a summary from a cart snapshot.
    #[must_use]
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let totals = CartTotals::from_lines(items.iter().map(|i| (i.price, i.quantity)));
        Self { items, totals }
    }

    /// An empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_items(Vec::new())
    }

    /// Number of distinct rows.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Sum of quantities.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for CartSummary {
    fn default() -> Self {
        Self::empty()
    }
}
