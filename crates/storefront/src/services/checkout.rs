//! Checkout: cart snapshot to order.
//!
//! Payment is simulated. A card number is accepted if it has at least
//! [`MIN_CARD_DIGITS`] digits, and approved if its last digit is even.

use tracing::{info, instrument, warn};

use crate::db::{CartRepository, OrderRepository, UserRepository};
use crate::error::{AppError, add_breadcrumb};
use crate::models::{CartSummary, NewOrder, Order};
use crate::state::AppState;

/// Shortest card number accepted, after removing spaces and dashes.
pub const MIN_CARD_DIGITS: usize = 16;

/// Outcome of the simulated payment step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentDecision {
    Approved,
    Declined,
}

/// Validate a card number and decide the simulated payment.
///
/// # Errors
///
/// Returns `AppError::Validation` if the number is not all digits or is too
/// short.
pub fn authorize_payment(card_number: &str) -> Result<PaymentDecision, AppError> {
    let digits: String = card_number
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    if digits.len() < MIN_CARD_DIGITS || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation("invalid card number".to_string()));
    }

    let approved = digits
        .chars()
        .last()
        .and_then(|c| c.to_digit(10))
        .is_some_and(|d| d % 2 == 0);

    Ok(if approved {
        PaymentDecision::Approved
    } else {
        PaymentDecision::Declined
    })
}

/// Turns the cart into an order.
pub struct CheckoutService<'a> {
    state: &'a AppState,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Pay for the cart and record the order.
    ///
    /// The order, its items, and the cart clear are written in one
    /// transaction. Totals come from the cart snapshot taken here.
    ///
    /// # Errors
    ///
    /// - `AppError::NotLoggedIn` without a session
    /// - `AppError::EmptyCart` if there is nothing to buy
    /// - `AppError::Validation` for a malformed card number
    /// - `AppError::PaymentDeclined` if the simulated payment fails
    #[instrument(skip(self, card_number))]
    pub async fn checkout(&self, card_number: &str) -> Result<Order, AppError> {
        let session = self.state.require_session().await?;
        let pool = self.state.pool();

        let cart = CartSummary::from_items(CartRepository::new(pool).list_items().await?);
        if cart.is_empty() {
            return Err(AppError::EmptyCart);
        }

        if authorize_payment(card_number)? == PaymentDecision::Declined {
            warn!(user_id = %session.user_id, "Payment declined");
            return Err(AppError::PaymentDeclined);
        }

        let user = UserRepository::new(pool).get_by_id(session.user_id).await?;
        let new_order = NewOrder::from_cart(
            session.user_id,
            Some(session.email.to_string()),
            user.map(|u| u.name),
            &cart,
        );

        let order = OrderRepository::new(pool)
            .create_with_items(&new_order)
            .await?;

        info!(
            order_number = %order.number,
            items = new_order.items.len(),
            total = %order.total,
            "Order placed"
        );
        add_breadcrumb(
            "checkout",
            "Order placed",
            Some(&[("order_number", order.number.as_str())]),
        );
        self.state.publish_cart(CartSummary::empty());
        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use keylab_core::{Email, OrderStatus, Price, ProductId, UserId};

    use super::*;
    use crate::db::SessionRepository;
    use crate::models::{NewUser, Product, Session};
    use crate::services::CartService;
    use crate::state::test_state;

    const GOOD_CARD: &str = "4111 1111 1111 1112";
    const BAD_CARD: &str = "4111-1111-1111-1111";

    fn product(id: i64, price: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Producto {id}"),
            price: Price::from_whole(price),
            category: "Teclados".to_string(),
            subcategory: None,
            description: None,
            stock: 10,
            image_url: None,
            created_at: None,
            updated_at: None,
        }
    }

    async fn sign_in(state: &AppState) -> UserId {
        let email = Email::parse("ana@example.com").unwrap();
        let user = UserRepository::new(state.pool())
            .create(&NewUser {
                name: "Ana".to_string(),
                email: email.clone(),
                password_hash: None,
                avatar_url: None,
            })
            .await
            .unwrap();
        SessionRepository::new(state.pool())
            .save(&Session {
                user_id: user.id,
                email,
                access_token: None,
                refresh_token: None,
                is_admin: false,
            })
            .await
            .unwrap();
        user.id
    }

    #[test]
    fn test_authorize_payment() {
        assert_eq!(authorize_payment(GOOD_CARD).unwrap(), PaymentDecision::Approved);
        assert_eq!(authorize_payment(BAD_CARD).unwrap(), PaymentDecision::Declined);
        assert_eq!(
            authorize_payment("4111111111111110").unwrap(),
            PaymentDecision::Approved
        );
        assert!(authorize_payment("4111").is_err());
        assert!(authorize_payment("4111 1111 1111 111x").is_err());
        assert!(authorize_payment("").is_err());
    }

    #[tokio::test]
    async fn test_checkout_creates_order_and_empties_cart() {
        let state = test_state("http://127.0.0.1:1").await;
        let user_id = sign_in(&state).await;
        let cart = CartService::new(&state);
        cart.add_product(&product(1, 45_000)).await.unwrap();
        cart.add_product(&product(2, 2_500)).await.unwrap();
        cart.add_product(&product(2, 2_500)).await.unwrap();
        let mut rx = cart.subscribe();

        let order = CheckoutService::new(&state).checkout(GOOD_CARD).await.unwrap();

        assert_eq!(order.user_id, user_id);
        assert_eq!(order.user_name.as_deref(), Some("Ana"));
        assert_eq!(order.subtotal, Price::from_whole(50_000));
        assert_eq!(order.shipping, Price::from_whole(3_990));
        assert_eq!(order.total, Price::from_whole(53_990));
        assert_eq!(order.status, OrderStatus::Completed);

        let items = OrderRepository::new(state.pool())
            .items_for_order(order.id)
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert!(cart.summary().await.unwrap().is_empty());
        assert!(rx.borrow_and_update().is_empty());
    }

    #[tokio::test]
    async fn test_declined_payment_keeps_cart() {
        let state = test_state("http://127.0.0.1:1").await;
        sign_in(&state).await;
        let cart = CartService::new(&state);
        cart.add_product(&product(1, 10_000)).await.unwrap();

        let result = CheckoutService::new(&state).checkout(BAD_CARD).await;
        assert!(matches!(result, Err(AppError::PaymentDeclined)));
        assert_eq!(cart.item_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_cart_and_missing_session() {
        let state = test_state("http://127.0.0.1:1").await;
        let checkout = CheckoutService::new(&state);
        assert!(matches!(
            checkout.checkout(GOOD_CARD).await,
            Err(AppError::NotLoggedIn)
        ));

        sign_in(&state).await;
        assert!(matches!(
            checkout.checkout(GOOD_CARD).await,
            Err(AppError::EmptyCart)
        ));
    }
}
