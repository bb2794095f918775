//! User repository for database operations.
//!
//! Users are keyed by email (case-insensitive). Remote sign-ins upsert into
//! this table so that offline login and order history keep working without a
//! connection.

use chrono::Utc;
use sqlx::SqlitePool;

use keylab_core::{Email, UserId};

use super::{RepositoryError, timestamp_from_millis};
use crate::models::{NewUser, User};

const SELECT_USER: &str = r"
    SELECT id, name, email, password_hash, registered_at, avatar_url
    FROM users
";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    password_hash: Option<String>,
    registered_at: i64,
    avatar_url: Option<String>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            name: row.name,
            email,
            password_hash: row.password_hash,
            registered_at: timestamp_from_millis(row.registered_at)?,
            avatar_url: row.avatar_url,
        })
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user, registered now.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let id = sqlx::query(
            r"
            INSERT INTO users (name, email, password_hash, registered_at, avatar_url)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(&user.name)
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(Utc::now().timestamp_millis())
        .bind(&user.avatar_url)
        .execute(self.pool)
        .await
        .map_err(|e| super::conflict_on_unique(e, "email already exists"))?
        .last_insert_rowid();

        self.get_by_id(UserId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Insert a user, or refresh the profile of an existing one.
    ///
    /// For an existing email the name is overwritten; the avatar and password
    /// hash are only overwritten when the new values are present. The
    /// registration date is never changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the write fails.
    pub async fn upsert_by_email(&self, user: &NewUser) -> Result<User, RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO users (name, email, password_hash, registered_at, avatar_url)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (email) DO UPDATE SET
                name = excluded.name,
                password_hash = COALESCE(excluded.password_hash, users.password_hash),
                avatar_url = COALESCE(excluded.avatar_url, users.avatar_url)
            ",
        )
        .bind(&user.name)
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(Utc::now().timestamp_millis())
        .bind(&user.avatar_url)
        .execute(self.pool)
        .await?;

        self.get_by_email(&user.email)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!("{SELECT_USER} WHERE email = ?1"))
            .bind(email.as_str())
            .fetch_optional(self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!("{SELECT_USER} WHERE id = ?1"))
            .bind(id.as_i64())
            .fetch_optional(self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    /// Whether a user with this email exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn email_exists(&self, email: &Email) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = ?1)")
                .bind(email.as_str())
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// All users, most recently registered first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<User>, RepositoryError> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "{SELECT_USER} ORDER BY registered_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    /// Number of users.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
