//! Cart aggregation.
//!
//! One row per product. Adding a product already in the cart bumps its
//! quantity; a row whose quantity reaches zero is deleted. Every mutation
//! publishes the new [`CartSummary`].

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, instrument};

use keylab_core::{Price, ProductId};

use crate::db::{CartRepository, RepositoryError};
use crate::error::{AppError, add_breadcrumb};
use crate::models::{CartItem, CartSummary, Product};
use crate::state::AppState;

/// Local cart operations.
pub struct CartService<'a> {
    state: &'a AppState,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    fn repo(&self) -> CartRepository<'_> {
        CartRepository::new(self.state.pool())
    }

    /// Re-read the cart and publish it.
    async fn publish(&self) -> Result<CartSummary, AppError> {
        let summary = self.summary().await?;
        self.state.publish_cart(summary.clone());
        Ok(summary)
    }

    /// Add one unit of `product`.
    ///
    /// The first add snapshots name, price, category, and image; later adds
    /// only bump the quantity.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the product is out of stock.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_product(&self, product: &Product) -> Result<CartSummary, AppError> {
        if !product.in_stock() {
            return Err(AppError::Validation(format!(
                "{} is out of stock",
                product.name
            )));
        }

        let repo = self.repo();
        match repo.get_by_product_id(product.id).await? {
            Some(existing) => {
                repo.set_quantity(product.id, existing.quantity.saturating_add(1))
                    .await?;
            }
            None => {
                let item = CartItem {
                    product_id: product.id,
                    name: product.name.clone(),
                    price: product.price,
                    category: product.category.clone(),
                    image_url: product.image_url.clone(),
                    quantity: 1,
                    added_at: Utc::now(),
                };
                repo.insert(&item).await?;
            }
        }

        let id = product.id.to_string();
        add_breadcrumb("cart", "Added product", Some(&[("product_id", id.as_str())]));
        self.publish().await
    }

    /// Add one unit of a product already in the cart.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the product is not in the cart.
    pub async fn increment(&self, product_id: ProductId) -> Result<CartSummary, AppError> {
        let item = self.require_item(product_id).await?;
        self.repo()
            .set_quantity(product_id, item.quantity.saturating_add(1))
            .await?;
        self.publish().await
    }

    /// Remove one unit; the row is deleted when it reaches zero.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the product is not in the cart.
    pub async fn decrement(&self, product_id: ProductId) -> Result<CartSummary, AppError> {
        let item = self.require_item(product_id).await?;
        let repo = self.repo();
        if item.quantity <= 1 {
            repo.delete_by_product_id(product_id).await?;
        } else {
            repo.set_quantity(product_id, item.quantity - 1).await?;
        }
        self.publish().await
    }

    /// Set the quantity of a row. Zero or less removes it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the product is not in the cart.
    pub async fn set_quantity(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartSummary, AppError> {
        let repo = self.repo();
        if quantity <= 0 {
            if !repo.delete_by_product_id(product_id).await? {
                return Err(not_in_cart(product_id));
            }
        } else {
            let quantity = u32::try_from(quantity)
                .map_err(|_| AppError::Validation(format!("quantity too large: {quantity}")))?;
            repo.set_quantity(product_id, quantity)
                .await
                .map_err(|e| match e {
                    RepositoryError::NotFound => not_in_cart(product_id),
                    other => other.into(),
                })?;
        }
        self.publish().await
    }

    /// Remove a product from the cart.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the product is not in the cart.
    pub async fn remove(&self, product_id: ProductId) -> Result<CartSummary, AppError> {
        if !self.repo().delete_by_product_id(product_id).await? {
            return Err(not_in_cart(product_id));
        }
        self.publish().await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the cache cannot be written.
    pub async fn clear(&self) -> Result<CartSummary, AppError> {
        self.repo().clear().await?;
        debug!("Cart cleared");
        self.publish().await
    }

    /// Cart rows, most recently added first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the cache cannot be read.
    pub async fn items(&self) -> Result<Vec<CartItem>, AppError> {
        Ok(self.repo().list_items().await?)
    }

    /// Number of distinct products in the cart.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the cache cannot be read.
    pub async fn item_count(&self) -> Result<i64, AppError> {
        Ok(self.repo().count().await?)
    }

    /// Sum of `price * quantity` over all rows.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the cache cannot be read.
    pub async fn subtotal(&self) -> Result<Price, AppError> {
        Ok(self.summary().await?.totals.subtotal)
    }

    /// Rows plus subtotal, shipping, and total.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the cache cannot be read.
    pub async fn summary(&self) -> Result<CartSummary, AppError> {
        Ok(CartSummary::from_items(self.items().await?))
    }

    /// Observe cart changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSummary> {
        self.state.subscribe_cart()
    }

    async fn require_item(&self, product_id: ProductId) -> Result<CartItem, AppError> {
        self.repo()
            .get_by_product_id(product_id)
            .await?
            .ok_or_else(|| not_in_cart(product_id))
    }
}

fn not_in_cart(product_id: ProductId) -> AppError {
    AppError::NotFound(format!("product {product_id} is not in the cart"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::state::test_state;

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

    #[tokio::test]
    async fn test_adding_twice_merges_rows() {
        let state = test_state("http://127.0.0.1:1").await;
        let cart = CartService::new(&state);
        let p = product(1, 45_000);

        cart.add_product(&p).await.unwrap();
        let summary = cart.add_product(&p).await.unwrap();

        assert_eq!(summary.item_count(), 1);
        assert_eq!(summary.items[0].quantity, 2);
        assert_eq!(summary.totals.subtotal, Price::from_whole(90_000));
        assert_eq!(summary.totals.shipping, Price::ZERO);
    }

    #[tokio::test]
    async fn test_single_item_totals() {
        let state = test_state("http://127.0.0.1:1").await;
        let cart = CartService::new(&state);

        let summary = cart.add_product(&product(1, 45_000)).await.unwrap();
        assert_eq!(summary.totals.subtotal, Price::from_whole(45_000));
        assert_eq!(summary.totals.shipping, Price::from_whole(3_990));
        assert_eq!(summary.totals.total, Price::from_whole(48_990));
    }

    #[tokio::test]
    async fn test_decrement_at_one_removes_row() {
        let state = test_state("http://127.0.0.1:1").await;
        let cart = CartService::new(&state);
        cart.add_product(&product(1, 1_000)).await.unwrap();

        let summary = cart.decrement(ProductId::new(1)).await.unwrap();
        assert!(summary.is_empty());
        assert!(matches!(
            cart.decrement(ProductId::new(1)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_increment_and_set_quantity() {
        let state = test_state("http://127.0.0.1:1").await;
        let cart = CartService::new(&state);
        cart.add_product(&product(1, 1_000)).await.unwrap();
        cart.add_product(&product(2, 2_000)).await.unwrap();

        cart.increment(ProductId::new(1)).await.unwrap();
        let summary = cart.set_quantity(ProductId::new(2), 5).await.unwrap();
        assert_eq!(summary.total_quantity(), 7);
        assert_eq!(cart.subtotal().await.unwrap(), Price::from_whole(12_000));

        let summary = cart.set_quantity(ProductId::new(2), 0).await.unwrap();
        assert_eq!(summary.item_count(), 1);
        assert!(cart.set_quantity(ProductId::new(2), 3).await.is_err());
    }

    #[tokio::test]
    async fn test_out_of_stock_rejected() {
        let state = test_state("http://127.0.0.1:1").await;
        let cart = CartService::new(&state);
        let mut p = product(1, 1_000);
        p.stock = 0;
        assert!(matches!(
            cart.add_product(&p).await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(cart.item_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mutations_publish_summary() {
        let state = test_state("http://127.0.0.1:1").await;
        let cart = CartService::new(&state);
        let mut rx = cart.subscribe();

        cart.add_product(&product(1, 1_000)).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().total_quantity(), 1);

        cart.remove(ProductId::new(1)).await.unwrap();
        assert!(rx.borrow_and_update().is_empty());

        cart.add_product(&product(2, 1_000)).await.unwrap();
        cart.clear().await.unwrap();
        assert!(rx.borrow().is_empty());
    }
}
