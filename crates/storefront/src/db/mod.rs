//! Local SQLite cache.
//!
//! Reads in the storefront come exclusively from here; the remote backend is
//! only consulted to refresh it.
//!
//! ## Tables
//!
//! - `products` - Mirror of the remote catalog, replaced wholesale on sync
//! - `cart_items` - The device-local cart, one row per product
//! - `orders` / `order_items` - Placed orders and their line snapshots
//! - `users` - Accounts that have signed in on this device
//! - `addresses` - Shipping addresses per user
//! - `session` - Key-value block for the signed-in user
//!
//! # Schema versioning
//!
//! The schema version lives in `PRAGMA user_version`. When it does not match
//! [`schema::SCHEMA_VERSION`], every table is dropped and recreated. There is
//! no migration path: the cache is rebuilt from the backend on the next sync.

pub mod addresses;
pub mod cart;
pub mod orders;
pub mod products;
pub mod schema;
pub mod session;
pub mod users;

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use keylab_core::Price;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{info, warn};

pub use addresses::AddressRepository;
pub use cart::CartRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use session::SessionRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a SQLite connection pool and bring the schema up to date.
///
/// In-memory databases get a single connection that is never recycled, since
/// every SQLite connection to `:memory:` opens its own empty database.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the connection cannot be
/// established or the schema cannot be created.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, RepositoryError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = if is_in_memory(database_url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await?
    };

    migrate(&pool).await?;
    Ok(pool)
}

/// Ensure the schema matches [`schema::SCHEMA_VERSION`], recreating it if not.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if any statement fails.
pub async fn migrate(pool: &SqlitePool) -> Result<(), RepositoryError> {
    let version: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await?;

    if version == schema::SCHEMA_VERSION {
        return Ok(());
    }

    if version != 0 {
        warn!(
            found = version,
            expected = schema::SCHEMA_VERSION,
            "Local cache schema is out of date, rebuilding"
        );
    }
    reset(pool).await
}

/// Drop and recreate every table, discarding all local data.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if any statement fails.
pub async fn reset(pool: &SqlitePool) -> Result<(), RepositoryError> {
    let mut tx = pool.begin().await?;
    sqlx::raw_sql(schema::DROP_TABLES).execute(&mut *tx).await?;
    sqlx::raw_sql(schema::CREATE_TABLES).execute(&mut *tx).await?;
    tx.commit().await?;

    let set_version = format!("PRAGMA user_version = {}", schema::SCHEMA_VERSION);
    sqlx::raw_sql(&set_version).execute(pool).await?;

    info!(version = schema::SCHEMA_VERSION, "Local cache schema created");
    Ok(())
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// Convert stored epoch milliseconds back into a timestamp.
pub(crate) fn timestamp_from_millis(millis: i64) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| RepositoryError::DataCorruption(format!("invalid timestamp: {millis}")))
}

/// Parse a stored decimal price.
pub(crate) fn parse_price(raw: &str) -> Result<Price, RepositoryError> {
    raw.parse()
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid price {raw:?}: {e}")))
}

/// Map a unique-constraint failure to `Conflict`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) async fn test_pool() -> SqlitePool {
    create_pool("sqlite::memory:")
        .await
        .expect("in-memory pool")
}
