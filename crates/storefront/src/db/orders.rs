//! Order repository.
//!
//! Orders are written once, at checkout, together with their items and the
//! cart clear. They are never updated afterwards.

use sqlx::SqlitePool;

use keylab_core::{OrderId, OrderItemId, OrderNumber, OrderStatus, UserId};

use super::{RepositoryError, parse_price, timestamp_from_millis};
use crate::models::{NewOrder, Order, OrderItem};

const SELECT_ORDER: &str = r"
    SELECT id, user_id, user_email, user_name, order_number, subtotal,
           shipping, total, created_at, status
    FROM orders
";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    user_id: i64,
    user_email: Option<String>,
    user_name: Option<String>,
    order_number: String,
    subtotal: String,
    shipping: String,
    total: String,
    created_at: i64,
    status: String,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let number = OrderNumber::parse(&row.order_number).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid order number in database: {e}"))
        })?;
        let status: OrderStatus = row
            .status
            .parse()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            user_email: row.user_email,
            user_name: row.user_name,
            number,
            subtotal: parse_price(&row.subtotal)?,
            shipping: parse_price(&row.shipping)?,
            total: parse_price(&row.total)?,
            created_at: timestamp_from_millis(row.created_at)?,
            status,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    product_name: String,
    quantity: i64,
    unit_price: String,
    subtotal: String,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!("invalid item quantity: {}", row.quantity))
        })?;

        Ok(Self {
            id: OrderItemId::new(row.id),
            order_id: OrderId::new(row.order_id),
            product_name: row.product_name,
            quantity,
            unit_price: parse_price(&row.unit_price)?,
            subtotal: parse_price(&row.subtotal)?,
        })
    }
}

/// Repository for placed orders.
pub struct OrderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an order and its items, then clear the cart, in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order number is already used.
    /// Returns `RepositoryError::Database` for other database errors. Nothing
    /// is written and the cart is left intact on failure.
    pub async fn create_with_items(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let order_id = sqlx::query(
            r"
            INSERT INTO orders (user_id, user_email, user_name, order_number,
                                subtotal, shipping, total, created_at, status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(order.user_id.as_i64())
        .bind(&order.user_email)
        .bind(&order.user_name)
        .bind(order.number.as_str())
        .bind(order.totals.subtotal.to_string())
        .bind(order.totals.shipping.to_string())
        .bind(order.totals.total.to_string())
        .bind(order.created_at.timestamp_millis())
        .bind(order.status.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| super::conflict_on_unique(e, "order number already exists"))?
        .last_insert_rowid();

        for item in &order.items {
            sqlx::query(
                r"
                INSERT INTO order_items (order_id, product_name, quantity, unit_price, subtotal)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
            )
            .bind(order_id)
            .bind(&item.product_name)
            .bind(i64::from(item.quantity))
            .bind(item.unit_price.to_string())
            .bind(item.subtotal.to_string())
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM cart_items")
            .execute(&mut *tx)
            .await?;

        let row: OrderRow = sqlx::query_as(&format!("{SELECT_ORDER} WHERE id = ?1"))
            .bind(order_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Order::try_from(row)
    }

    /// Orders placed by `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "{SELECT_ORDER} WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id.as_i64())
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(Order::try_from).collect()
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!("{SELECT_ORDER} WHERE id = ?1"))
            .bind(id.as_i64())
            .fetch_optional(self.pool)
            .await?;
        row.map(Order::try_from).transpose()
    }

    /// Items of an order, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items_for_order(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows: Vec<OrderItemRow> = sqlx::query_as(
            r"
            SELECT id, order_id, product_name, quantity, unit_price, subtotal
            FROM order_items
            WHERE order_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(order_id.as_i64())
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(OrderItem::try_from).collect()
    }

    /// Number of orders placed by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_for_user(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = ?1")
            .bind(user_id.as_i64())
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};
    use keylab_core::{Price, ProductId};

    use super::*;
    use crate::db::{CartRepository, test_pool};
    use crate::models::{CartItem, CartSummary};

    fn cart_item(id: i64, price: i64, quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::new(id),
            name: format!("Producto {id}"),
            price: Price::from_whole(price),
            category: "Teclados".to_string(),
            image_url: None,
            quantity,
            added_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_with_items_clears_cart() {
        let pool = test_pool().await;
        let cart = CartRepository::new(&pool);
        let items = vec![cart_item(1, 45_000, 1), cart_item(2, 2_500, 2)];
        for item in &items {
            cart.insert(item).await.unwrap();
        }

        let summary = CartSummary::from_items(items);
        let new_order = NewOrder::from_cart(
            UserId::new(1),
            Some("ana@example.com".to_string()),
            Some("Ana".to_string()),
            &summary,
        );

        let repo = OrderRepository::new(&pool);
        let order = repo.create_with_items(&new_order).await.unwrap();

        assert_eq!(order.number, new_order.number);
        assert_eq!(order.subtotal, Price::from_whole(50_000));
        assert_eq!(order.shipping, Price::from_whole(3_990));
        assert_eq!(order.total, Price::from_whole(53_990));
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(cart.count().await.unwrap(), 0);

        let stored_items = repo.items_for_order(order.id).await.unwrap();
        assert_eq!(stored_items.len(), 2);
        assert_eq!(stored_items[1].subtotal, Price::from_whole(5_000));
    }

    #[tokio::test]
    async fn test_duplicate_number_rolls_back() {
        let pool = test_pool().await;
        let cart = CartRepository::new(&pool);
        cart.insert(&cart_item(1, 1_000, 1)).await.unwrap();

        let summary = CartSummary::from_items(cart.list_items().await.unwrap());
        let new_order = NewOrder::from_cart(UserId::new(1), None, None, &summary);
        let repo = OrderRepository::new(&pool);
        repo.create_with_items(&new_order).await.unwrap();

        cart.insert(&cart_item(2, 1_000, 1)).await.unwrap();
        assert!(matches!(
            repo.create_with_items(&new_order).await,
            Err(RepositoryError::Conflict(_))
        ));
        assert_eq!(cart.count().await.unwrap(), 1);
        assert_eq!(repo.count_for_user(UserId::new(1)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_for_user_newest_first() {
        let pool = test_pool().await;
        let repo = OrderRepository::new(&pool);
        let summary = CartSummary::from_items(vec![cart_item(1, 1_000, 1)]);

        let mut older = NewOrder::from_cart(UserId::new(5), None, None, &summary);
        older.created_at = Utc::now() - Duration::days(2);
        let newer = NewOrder::from_cart(UserId::new(5), None, None, &summary);
        let other = NewOrder::from_cart(UserId::new(6), None, None, &summary);

        let older = repo.create_with_items(&older).await.unwrap();
        let newer = repo.create_with_items(&newer).await.unwrap();
        repo.create_with_items(&other).await.unwrap();

        let ids: Vec<OrderId> = repo
            .list_for_user(UserId::new(5))
            .await
            .unwrap()
            .iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, vec![newer.id, older.id]);
        assert_eq!(repo.get_by_id(older.id).await.unwrap().unwrap(), older);
        assert!(repo.get_by_id(OrderId::new(999)).await.unwrap().is_none());
    }
}
