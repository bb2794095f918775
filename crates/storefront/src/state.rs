//! Application state shared by every service.

use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::watch;

use keylab_core::Outcome;

use crate::backend::Backend;
use crate::config::StorefrontConfig;
use crate::db::{self, CartRepository, SessionRepository};
use crate::error::AppError;
use crate::models::{CartSummary, Session};

/// Application state shared across services.
///
/// Built once at startup and passed explicitly; cheaply cloneable via `Arc`.
/// Holds the cache pool, the backend clients, and the watch channels that
/// publish sync status and cart contents.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: SqlitePool,
    backend: Backend,
    sync_status: watch::Sender<Outcome<usize>>,
    cart_summary: watch::Sender<CartSummary>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The cart channel starts from the rows already in the cache. The sync
    /// channel starts at `Outcome::Pending` and stays there until the first
    /// [`CatalogService::sync_products`](crate::services::CatalogService::sync_products)
    /// finishes; before that, `Pending` means "no sync has completed yet".
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - SQLite pool with an up-to-date schema
    ///
    /// # Errors
    ///
    /// Returns `AppError::Remote` if the backend clients cannot be built, or
    /// `AppError::Database` if the cart cannot be read.
    pub async fn new(config: StorefrontConfig, pool: SqlitePool) -> Result<Self, AppError> {
        let backend = Backend::new(&config.backend)?;
        let items = CartRepository::new(&pool).list_items().await?;
        let (sync_status, _) = watch::channel(Outcome::Pending);
        let (cart_summary, _) = watch::channel(CartSummary::from_items(items));

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                backend,
                sync_status,
                cart_summary,
            }),
        })
    }

    /// Open the cache at `config.database_url` and build the state.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the cache cannot be opened.
    pub async fn connect(config: StorefrontConfig) -> Result<Self, AppError> {
        let pool = db::create_pool(&config.database_url).await?;
        Self::new(config, pool).await
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the cache connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    /// Get a reference to the backend clients.
    #[must_use]
    pub fn backend(&self) -> &Backend {
        &self.inner.backend
    }

    /// The stored session, if someone is signed in.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the session block cannot be read.
    pub async fn session(&self) -> Result<Option<Session>, AppError> {
        Ok(SessionRepository::new(self.pool()).load().await?)
    }

    /// The stored session, or `AppError::NotLoggedIn`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotLoggedIn` if nobody is signed in.
    pub async fn require_session(&self) -> Result<Session, AppError> {
        self.session().await?.ok_or(AppError::NotLoggedIn)
    }

    /// Publish a product sync status.
    pub(crate) fn publish_sync_status(&self, status: Outcome<usize>) {
        self.inner.sync_status.send_replace(status);
    }

    /// Observe product sync status changes.
    #[must_use]
    pub fn subscribe_sync(&self) -> watch::Receiver<Outcome<usize>> {
        self.inner.sync_status.subscribe()
    }

    /// Publish new cart contents.
    pub(crate) fn publish_cart(&self, summary: CartSummary) {
        self.inner.cart_summary.send_replace(summary);
    }

    /// Observe cart changes.
    #[must_use]
    pub fn subscribe_cart(&self) -> watch::Receiver<CartSummary> {
        self.inner.cart_summary.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
fn test_config(backend_url: &str) -> StorefrontConfig {
    use secrecy::SecretString;

    use crate::config::BackendConfig;

    let backend = BackendConfig::new(backend_url, SecretString::from("test-anon-key"))
        .expect("backend config");
    StorefrontConfig {
        database_url: "sqlite::memory:".to_string(),
        backend,
        admin_domain: "keylab.com".to_string(),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) async fn test_state(backend_url: &str) -> AppState {
    AppState::connect(test_config(backend_url))
        .await
        .expect("test state")
}
