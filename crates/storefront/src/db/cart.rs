//! Cart repository.

use sqlx::SqlitePool;

use keylab_core::ProductId;

use super::{RepositoryError, parse_price, timestamp_from_millis};
use crate::models::CartItem;

const SELECT_ITEM: &str = r"
    SELECT product_id, name, price, category, image_url, quantity, added_at
    FROM cart_items
";

#[derive(sqlx::FromRow)]
struct CartItemRow {
    product_id: i64,
    name: String,
    price: String,
    category: String,
    image_url: Option<String>,
    quantity: i64,
    added_at: i64,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity)
            .ok()
            .filter(|q| *q >= 1)
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!("invalid cart quantity: {}", row.quantity))
            })?;

        Ok(Self {
            product_id: ProductId::new(row.product_id),
            name: row.name,
            price: parse_price(&row.price)?,
            category: row.category,
            image_url: row.image_url,
            quantity,
            added_at: timestamp_from_millis(row.added_at)?,
        })
    }
}

/// Repository for the local cart.
pub struct CartRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// All cart rows, most recently added first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_items(&self) -> Result<Vec<CartItem>, RepositoryError> {
        let rows: Vec<CartItemRow> =
            sqlx::query_as(&format!("{SELECT_ITEM} ORDER BY added_at DESC, rowid DESC"))
                .fetch_all(self.pool)
                .await?;
        rows.into_iter().map(CartItem::try_from).collect()
    }

    /// The row for `product_id`, if the product is in the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_product_id(
        &self,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let row: Option<CartItemRow> =
            sqlx::query_as(&format!("{SELECT_ITEM} WHERE product_id = ?1"))
                .bind(product_id.as_i64())
                .fetch_optional(self.pool)
                .await?;
        row.map(CartItem::try_from).transpose()
    }

    /// Insert a new row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product is already in the cart.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert(&self, item: &CartItem) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO cart_items (product_id, name, price, category, image_url, quantity, added_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(item.product_id.as_i64())
        .bind(&item.name)
        .bind(item.price.to_string())
        .bind(&item.category)
        .bind(&item.image_url)
        .bind(i64::from(item.quantity))
        .bind(item.added_at.timestamp_millis())
        .execute(self.pool)
        .await
        .map_err(|e| super::conflict_on_unique(e, "product already in cart"))?;
        Ok(())
    }

    /// Set the quantity of an existing row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is not in the cart.
    /// Returns `RepositoryError::Database` if the write fails (including a
    /// quantity of zero, which the table rejects).
    pub async fn set_quantity(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE cart_items SET quantity = ?2 WHERE product_id = ?1")
            .bind(product_id.as_i64())
            .bind(i64::from(quantity))
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Remove a product from the cart. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_by_product_id(&self, product_id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE product_id = ?1")
            .bind(product_id.as_i64())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items")
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Number of distinct rows.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM cart_items")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Sum of quantities across all rows.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn total_quantity(&self) -> Result<i64, RepositoryError> {
        let total = sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0) FROM cart_items")
            .fetch_one(self.pool)
            .await?;
        Ok(total)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, Utc};
    use keylab_core::Price;

    use super::*;
    use crate::db::test_pool;

    fn item(id: i64, minutes_ago: i64) -> CartItem {
        CartItem {
            product_id: ProductId::new(id),
            name: format!("Producto {id}"),
            price: Price::from_whole(1_000),
            category: "Teclados".to_string(),
            image_url: None,
            quantity: 1,
            added_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[tokio::test]
    async fn test_list_items_newest_first() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);
        repo.insert(&item(1, 30)).await.unwrap();
        repo.insert(&item(2, 10)).await.unwrap();
        repo.insert(&item(3, 20)).await.unwrap();

        let ids: Vec<i64> = repo
            .list_items()
            .await
            .unwrap()
            .iter()
            .map(|i| i.product_id.as_i64())
            .collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn test_insert_duplicate_conflicts() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);
        repo.insert(&item(1, 0)).await.unwrap();
        assert!(matches!(
            repo.insert(&item(1, 0)).await,
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_set_quantity_and_totals() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);
        repo.insert(&item(1, 0)).await.unwrap();
        repo.insert(&item(2, 0)).await.unwrap();

        repo.set_quantity(ProductId::new(1), 4).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 2);
        assert_eq!(repo.total_quantity().await.unwrap(), 5);

        let stored = repo.get_by_product_id(ProductId::new(1)).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 4);

        assert!(matches!(
            repo.set_quantity(ProductId::new(99), 1).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected_by_table() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);
        repo.insert(&item(1, 0)).await.unwrap();
        assert!(repo.set_quantity(ProductId::new(1), 0).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let pool = test_pool().await;
        let repo = CartRepository::new(&pool);
        repo.insert(&item(1, 0)).await.unwrap();
        repo.insert(&item(2, 0)).await.unwrap();

        assert!(repo.delete_by_product_id(ProductId::new(1)).await.unwrap());
        assert!(!repo.delete_by_product_id(ProductId::new(1)).await.unwrap());

        repo.clear().await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
        assert_eq!(repo.total_quantity().await.unwrap(), 0);
    }
}
