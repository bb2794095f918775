//! Order history for the signed-in user.

use keylab_core::OrderId;

use crate::db::OrderRepository;
use crate::error::AppError;
use crate::models::{Order, OrderReceipt};
use crate::state::AppState;

/// Read-only access to past orders.
pub struct OrderService<'a> {
    state: &'a AppState,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    fn repo(&self) -> OrderRepository<'_> {
        OrderRepository::new(self.state.pool())
    }

    /// The signed-in user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotLoggedIn` without a session.
    pub async fn history(&self) -> Result<Vec<Order>, AppError> {
        let session = self.state.require_session().await?;
        Ok(self.repo().list_for_user(session.user_id).await?)
    }

    /// One of the signed-in user's orders.
    ///
    /// Orders of other users are reported as not found.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user has no such order.
    pub async fn order(&self, id: OrderId) -> Result<Order, AppError> {
        let session = self.state.require_session().await?;
        self.repo()
            .get_by_id(id)
            .await?
            .filter(|order| order.user_id == session.user_id)
            .ok_or_else(|| AppError::NotFound(format!("order {id}")))
    }

    /// An order with its items.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user has no such order.
    pub async fn receipt(&self, id: OrderId) -> Result<OrderReceipt, AppError> {
        let order = self.order(id).await?;
        let items = self.repo().items_for_order(order.id).await?;
        Ok(OrderReceipt { order, items })
    }

    /// Number of orders the signed-in user has placed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotLoggedIn` without a session.
    pub async fn count(&self) -> Result<i64, AppError> {
        let session = self.state.require_session().await?;
        Ok(self.repo().count_for_user(session.user_id).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use keylab_core::{Email, Price, ProductId, UserId};

    use super::*;
    use crate::db::SessionRepository;
    use crate::models::{CartItem, CartSummary, NewOrder, Session};
    use crate::state::test_state;

    async fn place(state: &AppState, user_id: i64) -> Order {
        let cart = CartSummary::from_items(vec![CartItem {
            product_id: ProductId::new(1),
            name: "Switch".to_string(),
            price: Price::from_whole(500),
            category: "Switches".to_string(),
            image_url: None,
            quantity: 3,
            added_at: Utc::now(),
        }]);
        OrderRepository::new(state.pool())
            .create_with_items(&NewOrder::from_cart(UserId::new(user_id), None, None, &cart))
            .await
            .unwrap()
    }

    async fn sign_in(state: &AppState, user_id: i64) {
        SessionRepository::new(state.pool())
            .save(&Session {
                user_id: UserId::new(user_id),
                email: Email::parse("ana@example.com").unwrap(),
                access_token: None,
                refresh_token: None,
                is_admin: false,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_history_is_scoped_to_session_user() {
        let state = test_state("http://127.0.0.1:1").await;
        let mine = place(&state, 1).await;
        let theirs = place(&state, 2).await;
        sign_in(&state, 1).await;

        let orders = OrderService::new(&state);
        let history = orders.history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, mine.id);
        assert_eq!(orders.count().await.unwrap(), 1);

        assert!(matches!(
            orders.order(theirs.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_receipt_includes_items() {
        let state = test_state("http://127.0.0.1:1").await;
        let order = place(&state, 1).await;
        sign_in(&state, 1).await;

        let receipt = OrderService::new(&state).receipt(order.id).await.unwrap();
        assert_eq!(receipt.order, order);
        assert_eq!(receipt.items.len(), 1);
        assert_eq!(receipt.items[0].subtotal, Price::from_whole(1_500));
    }

    #[tokio::test]
    async fn test_history_requires_login() {
        let state = test_state("http://127.0.0.1:1").await;
        assert!(matches!(
            OrderService::new(&state).history().await,
            Err(AppError::NotLoggedIn)
        ));
    }
}
