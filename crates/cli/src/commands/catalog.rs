//! Catalog commands.
//!
//! # Usage
//!
//! ```bash
//! keylab sync
//! keylab products list
//! keylab products search "switch"
//! keylab products search "ñandú" --remote
//! keylab products category Teclados
//! keylab products category Teclados --refresh
//! keylab products show 12 --refresh
//! keylab db reset
//! ```

use keylab_core::ProductId;
use keylab_storefront::db;
use keylab_storefront::error::AppError;
use keylab_storefront::models::Product;
use keylab_storefront::services::CatalogService;
use keylab_storefront::state::AppState;
use tracing::info;

/// Drop and recreate the local cache.
///
/// # Errors
///
/// Returns `AppError::Database` if the schema cannot be rebuilt.
pub async fn reset(state: &AppState) -> Result<(), AppError> {
    db::reset(state.pool()).await?;
    info!("Local cache reset");
    Ok(())
}

/// Replace the cached catalog with the backend's.
///
/// # Errors
///
/// Returns the sync error; the cached catalog is left untouched.
pub async fn sync(state: &AppState) -> Result<(), AppError> {
    let count = CatalogService::new(state).sync_products().await?;
    info!("Synchronized {count} products");
    Ok(())
}

/// List every cached product.
///
/// # Errors
///
/// Returns `AppError::Database` if the cache cannot be read.
pub async fn list(state: &AppState) -> Result<(), AppError> {
    print_products(&CatalogService::new(state).products().await?);
    Ok(())
}

/// Search products by name, in the cache or on the backend.
///
/// # Errors
///
/// Returns `AppError::Database` if the cache cannot be read, or
/// `AppError::Remote` if a remote search fails.
pub async fn search(state: &AppState, query: &str, remote: bool) -> Result<(), AppError> {
    let catalog = CatalogService::new(state);
    let products = if remote {
        catalog.search_remote(query).await?
    } else {
        catalog.search(query).await?
    };
    print_products(&products);
    Ok(())
}

/// List products in one category, optionally refreshing it first.
///
/// # Errors
///
/// Returns `AppError::Database` if the cache cannot be read, or
/// `AppError::Remote` if the refresh fails.
pub async fn by_category(state: &AppState, category: &str, refresh: bool) -> Result<(), AppError> {
    let catalog = CatalogService::new(state);
    let products = if refresh {
        catalog.refresh_category(category).await?
    } else {
        catalog.by_category(category).await?
    };
    print_products(&products);
    Ok(())
}

/// List products that have stock.
///
/// # Errors
///
/// Returns `AppError::Database` if the cache cannot be read.
pub async fn in_stock(state: &AppState) -> Result<(), AppError> {
    print_products(&CatalogService::new(state).in_stock().await?);
    Ok(())
}

/// Show one product, optionally refreshing it from the backend first.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the product does not exist.
pub async fn show(state: &AppState, id: ProductId, refresh: bool) -> Result<(), AppError> {
    let catalog = CatalogService::new(state);
    let product = if refresh {
        catalog.refresh_product(id).await?
    } else {
        catalog.product(id).await?
    }
    .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    info!("#{} {}", product.id, product.name);
    info!("  price:    {}", product.price.display());
    match &product.subcategory {
        Some(sub) => info!("  category: {} / {sub}", product.category),
        None => info!("  category: {}", product.category),
    }
    info!("  stock:    {}", product.stock);
    if let Some(description) = &product.description {
        info!("  {description}");
    }
    if let Some(url) = &product.image_url {
        info!("  image:    {url}");
    }
    Ok(())
}

/// List categories.
///
/// # Errors
///
/// Returns `AppError::Database` if the cache cannot be read.
pub async fn categories(state: &AppState) -> Result<(), AppError> {
    for category in CatalogService::new(state).categories().await? {
        info!("{category}");
    }
    Ok(())
}

fn print_products(products: &[Product]) {
    if products.is_empty() {
        info!("No products");
        return;
    }
    for product in products {
        let stock = if product.in_stock() {
            format!("{} in stock", product.stock)
        } else {
            "out of stock".to_string()
        };
        info!(
            "#{:<5} {:<40} {:>12}  {} ({stock})",
            product.id.to_string(),
            product.name,
            product.price.display(),
            product.category
        );
    }
}
