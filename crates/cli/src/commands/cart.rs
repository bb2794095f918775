//! Cart, checkout, and order history commands.
//!
//! # Usage
//!
//! ```bash
//! keylab cart add 12
//! keylab cart set 12 3
//! keylab cart show
//! keylab checkout --card "4111 1111 1111 1112"
//! keylab orders list
//! keylab orders show 1
//! ```

use keylab_core::{OrderId, ProductId};
use keylab_storefront::error::AppError;
use keylab_storefront::models::CartSummary;
use keylab_storefront::services::{CartService, CatalogService, CheckoutService, OrderService};
use keylab_storefront::state::AppState;
use tracing::info;

/// Print the cart and its totals.
///
/// # Errors
///
/// Returns `AppError::Database` if the cart cannot be read.
pub async fn show(state: &AppState) -> Result<(), AppError> {
    print_summary(&CartService::new(state).summary().await?);
    Ok(())
}

/// Add a cached product to the cart.
///
/// # Errors
///
/// Returns `AppError::NotFound` for an unknown product, or
/// `AppError::Validation` if it is out of stock.
pub async fn add(state: &AppState, product_id: ProductId) -> Result<(), AppError> {
    let product = CatalogService::new(state)
        .product(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;
    let summary = CartService::new(state).add_product(&product).await?;
    info!("Added {} to the cart", product.name);
    print_summary(&summary);
    Ok(())
}

/// Increase a line's quantity.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the product is not in the cart.
pub async fn increment(state: &AppState, product_id: ProductId) -> Result<(), AppError> {
    print_summary(&CartService::new(state).increment(product_id).await?);
    Ok(())
}

/// Decrease a line's quantity, removing it at one.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the product is not in the cart.
pub async fn decrement(state: &AppState, product_id: ProductId) -> Result<(), AppError> {
    print_summary(&CartService::new(state).decrement(product_id).await?);
    Ok(())
}

/// Set a line's quantity.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the product is not in the cart.
pub async fn set_quantity(
    state: &AppState,
    product_id: ProductId,
    quantity: i64,
) -> Result<(), AppError> {
    print_summary(
        &CartService::new(state)
            .set_quantity(product_id, quantity)
            .await?,
    );
    Ok(())
}

/// Remove a line.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the product is not in the cart.
pub async fn remove(state: &AppState, product_id: ProductId) -> Result<(), AppError> {
    print_summary(&CartService::new(state).remove(product_id).await?);
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns `AppError::Database` if the cart cannot be cleared.
pub async fn clear(state: &AppState) -> Result<(), AppError> {
    CartService::new(state).clear().await?;
    info!("Cart cleared");
    Ok(())
}

/// Pay for the cart and place an order.
///
/// # Errors
///
/// Returns `AppError::NotLoggedIn`, `AppError::EmptyCart`, or
/// `AppError::PaymentDeclined`.
pub async fn checkout(state: &AppState, card_number: &str) -> Result<(), AppError> {
    let order = CheckoutService::new(state).checkout(card_number).await?;
    info!(
        "Order {} placed, total {}",
        order.number,
        order.total.display()
    );
    Ok(())
}

/// List the signed-in user's orders.
///
/// # Errors
///
/// Returns `AppError::NotLoggedIn` without a session.
pub async fn orders(state: &AppState) -> Result<(), AppError> {
    let orders = OrderService::new(state).history().await?;
    if orders.is_empty() {
        info!("No orders yet");
    }
    for order in orders {
        info!(
            "#{:<4} {}  {}  {:>12}  {}",
            order.id.to_string(),
            order.number,
            order.created_at.format("%Y-%m-%d %H:%M"),
            order.total.display(),
            order.status
        );
    }
    Ok(())
}

/// Print one order receipt.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the order does not belong to the user.
pub async fn receipt(state: &AppState, id: OrderId) -> Result<(), AppError> {
    let receipt = OrderService::new(state).receipt(id).await?;
    let order = &receipt.order;
    info!("Order {} ({})", order.number, order.status);
    info!("Placed {}", order.created_at.format("%Y-%m-%d %H:%M"));
    for item in &receipt.items {
        info!(
            "  {} x{:<3} {:>12}",
            item.product_name,
            item.quantity,
            item.subtotal.display()
        );
    }
    info!("Subtotal {:>12}", order.subtotal.display());
    info!("Shipping {:>12}", order.shipping.display());
    info!("Total    {:>12}", order.total.display());
    Ok(())
}

fn print_summary(summary: &CartSummary) {
    if summary.is_empty() {
        info!("Cart is empty");
        return;
    }
    for item in &summary.items {
        info!(
            "#{:<5} {:<40} x{:<3} {:>12}",
            item.product_id.to_string(),
            item.name,
            item.quantity,
            item.line_total().display()
        );
    }
    let totals = &summary.totals;
    info!("Subtotal {:>12}", totals.subtotal.display());
    if totals.has_free_shipping() {
        info!("Shipping {:>12}", "free");
    } else {
        info!("Shipping {:>12}", totals.shipping.display());
    }
    info!("Total    {:>12}", totals.total.display());
}
