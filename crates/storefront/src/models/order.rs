//! Order types.
//!
//! Orders and their items are immutable once written: totals are computed
//! from the cart snapshot at checkout and trusted afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keylab_core::{CartTotals, OrderId, OrderItemId, OrderNumber, OrderStatus, Price, UserId};

use super::cart::CartSummary;

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    /// Email of the buyer at checkout time.
    pub user_email: Option<String>,
    /// Name of the buyer at checkout time.
    pub user_name: Option<String>,
    pub number: OrderNumber,
    pub subtotal: Price,
    pub shipping: Price,
    pub total: Price,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
}

/// A line of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Price,
    /// `unit_price * quantity`.
    pub subtotal: Price,
}

/// An order together with its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Order ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
    pub number: OrderNumber,
    pub totals: CartTotals,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub items: Vec<NewOrderItem>,
}

/// Order line ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Price,
    pub subtotal: Price,
}

impl NewOrder {
    /// Snapshot a cart into an order: one item per cart row, totals copied
    /// from the summary, and a freshly generated order number.
    #[must_use]
    pub fn from_cart(
        user_id: UserId,
        user_email: Option<String>,
        user_name: Option<String>,
        cart: &CartSummary,
    ) -> Self {
        let items = cart
            .items
            .iter()
            .map(|item| NewOrderItem {
                product_name: item.name.clone(),
                quantity: item.quantity,
                unit_price: item.price,
                subtotal: item.line_total(),
            })
            .collect();

        Self {
            user_id,
            user_email,
            user_name,
            number: OrderNumber::generate(),
            totals: cart.totals,
            created_at: Utc::now(),
            status: OrderStatus::default(),
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use keylab_core::ProductId;

    use super::*;
    use crate::models::CartItem;

    #[test]
    fn test_from_cart_snapshots_each_row() {
        let cart = CartSummary::from_items(vec![
            CartItem {
                product_id: ProductId::new(1),
                name: "Switch Red".to_string(),
                price: Price::from_whole(500),
                category: "Switches".to_string(),
                image_url: None,
                quantity: 90,
                added_at: Utc::now(),
            },
            CartItem {
                product_id: ProductId::new(2),
                name: "Keycaps PBT".to_string(),
                price: Price::from_whole(29_990),
                category: "Keycaps".to_string(),
                image_url: None,
                quantity: 1,
                added_at: Utc::now(),
            },
        ]);

        let order = NewOrder::from_cart(UserId::new(3), None, None, &cart);

        assert_eq!(order.items.len(), 2);
        assert_eq!(
            order.items[0],
            NewOrderItem {
                product_name: "Switch Red".to_string(),
                quantity: 90,
                unit_price: Price::from_whole(500),
                subtotal: Price::from_whole(45_000),
            }
        );
        assert_eq!(order.totals.subtotal, Price::from_whole(74_990));
        assert_eq!(order.totals.shipping, Price::ZERO);
        assert_eq!(order.status, OrderStatus::Completed);
        assert!(order.number.as_str().starts_with("ORD-"));
    }
}
