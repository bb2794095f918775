//! Catalog browsing and product synchronization.
//!
//! Reads come from the local cache only. [`CatalogService::sync_products`]
//! is the one place the full catalog is pulled from the backend, and it
//! replaces the cache wholesale. Narrower refreshes (one product, one
//! category, a name search) upsert what they fetch.
//!
//! Catalog reads always use the anonymous key. Product data is public and a
//! stale user token must not break browsing.

use tokio::sync::watch;
use tracing::{info, instrument, warn};

use keylab_core::{Outcome, ProductId};

use crate::backend::ApiContext;
use crate::backend::conversions::{convert_product, convert_products};
use crate::db::ProductRepository;
use crate::error::AppError;
use crate::models::Product;
use crate::state::AppState;

/// Catalog operations over the local cache.
pub struct CatalogService<'a> {
    state: &'a AppState,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    fn products_repo(&self) -> ProductRepository<'_> {
        ProductRepository::new(self.state.pool())
    }

    /// Replace the local catalog with the backend's.
    ///
    /// Publishes `Pending`, then `Success(count)` or `Error(message)` on the
    /// sync channel. On failure the cache is left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Remote` if the fetch fails, or `AppError::Database`
    /// if the cache cannot be written.
    #[instrument(skip(self))]
    pub async fn sync_products(&self) -> Result<usize, AppError> {
        self.state.publish_sync_status(Outcome::Pending);

        let result = self.fetch_and_replace().await;
        match &result {
            Ok(count) => {
                info!(count, "Product catalog synchronized");
                self.state.publish_sync_status(Outcome::Success(*count));
            }
            Err(e) => {
                warn!(error = %e, "Product sync failed, keeping cached catalog");
                self.state
                    .publish_sync_status(Outcome::Error(e.user_message()));
            }
        }
        result
    }

    async fn fetch_and_replace(&self) -> Result<usize, AppError> {
        let backend = self.state.backend();
        let records = backend.rest.fetch_products(&ApiContext::anonymous()).await?;
        let products = convert_products(records, &backend.storage);
        Ok(self.products_repo().replace_all(&products).await?)
    }

    /// Observe sync status. The receiver starts at the latest status, which
    /// is `Pending` until the first sync of this process completes.
    #[must_use]
    pub fn subscribe_sync(&self) -> watch::Receiver<Outcome<usize>> {
        self.state.subscribe_sync()
    }

    /// All cached products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the cache cannot be read.
    pub async fn products(&self) -> Result<Vec<Product>, AppError> {
        Ok(self.products_repo().list_all().await?)
    }

    /// A cached product.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the cache cannot be read.
    pub async fn product(&self, id: ProductId) -> Result<Option<Product>, AppError> {
        Ok(self.products_repo().get_by_id(id).await?)
    }

    /// Cached products whose name contains `query`, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the cache cannot be read.
    pub async fn search(&self, query: &str) -> Result<Vec<Product>, AppError> {
        Ok(self.products_repo().search_by_name(query.trim()).await?)
    }

    /// Cached products in `category`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the cache cannot be read.
    pub async fn by_category(&self, category: &str) -> Result<Vec<Product>, AppError> {
        Ok(self.products_repo().list_by_category(category).await?)
    }

    /// Cached products with stock.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the cache cannot be read.
    pub async fn in_stock(&self) -> Result<Vec<Product>, AppError> {
        Ok(self.products_repo().list_in_stock().await?)
    }

    /// Distinct cached categories.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the cache cannot be read.
    pub async fn categories(&self) -> Result<Vec<String>, AppError> {
        Ok(self.products_repo().list_categories().await?)
    }

    /// Re-fetch one product and update the cache.
    ///
    /// A product the backend no longer has is removed from the cache and
    /// `None` is returned.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Remote` if the fetch fails; the cache is untouched.
    #[instrument(skip(self))]
    pub async fn refresh_product(&self, id: ProductId) -> Result<Option<Product>, AppError> {
        let backend = self.state.backend();
        let repo = self.products_repo();

        match backend.rest.fetch_product(&ApiContext::anonymous(), id).await? {
            Some(record) => {
                let product = convert_product(record, &backend.storage);
                repo.upsert(&product).await?;
                Ok(Some(product))
            }
            None => {
                if repo.delete_by_id(id).await? {
                    info!(%id, "Removed product no longer in catalog");
                }
                Ok(None)
            }
        }
    }

    /// Re-fetch one category and bring its cached rows in line.
    ///
    /// Rows the backend returned are upserted; cached rows of the category
    /// it no longer lists are removed. Other categories are untouched.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Remote` if the fetch fails; the cache is untouched.
    #[instrument(skip(self))]
    pub async fn refresh_category(&self, category: &str) -> Result<Vec<Product>, AppError> {
        let backend = self.state.backend();
        let records = backend
            .rest
            .fetch_by_category(&ApiContext::anonymous(), category)
            .await?;
        let products = convert_products(records, &backend.storage);

        let repo = self.products_repo();
        repo.upsert_many(&products).await?;
        for stale in repo.list_by_category(category).await? {
            if !products.iter().any(|p| p.id == stale.id) {
                repo.delete_by_id(stale.id).await?;
                info!(id = %stale.id, "Removed product no longer in category");
            }
        }
        Ok(repo.list_by_category(category).await?)
    }

    /// Search the backend catalog by name and cache the matches.
    ///
    /// Use when the cache may be stale; [`Self::search`] never touches the
    /// network.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Remote` if the search fails.
    #[instrument(skip(self))]
    pub async fn search_remote(&self, query: &str) -> Result<Vec<Product>, AppError> {
        let backend = self.state.backend();
        let records = backend
            .rest
            .search_products(&ApiContext::anonymous(), query.trim())
            .await?;
        let products = convert_products(records, &backend.storage);
        self.products_repo().upsert_many(&products).await?;
        Ok(products)
    }
}
