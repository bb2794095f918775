//! Session block repository.
//!
//! The session is stored as key-value rows so a partially written block can be
//! detected on load.

use std::collections::HashMap;

use secrecy::{ExposeSecret, SecretString};
use sqlx::SqlitePool;

use keylab_core::{Email, UserId};

use super::RepositoryError;
use crate::models::Session;

const KEY_USER_ID: &str = "user_id";
const KEY_EMAIL: &str = "email";
const KEY_ACCESS_TOKEN: &str = "access_token";
const KEY_REFRESH_TOKEN: &str = "refresh_token";
const KEY_IS_ADMIN: &str = "is_admin";

/// Repository for the signed-in session.
pub struct SessionRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SessionRepository<'a> {
    /// Create a new session repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Replace the stored session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the write fails.
    pub async fn save(&self, session: &Session) -> Result<(), RepositoryError> {
        let mut entries = vec![
            (KEY_USER_ID, session.user_id.to_string()),
            (KEY_EMAIL, session.email.to_string()),
            (KEY_IS_ADMIN, session.is_admin.to_string()),
        ];
        if let Some(token) = &session.access_token {
            entries.push((KEY_ACCESS_TOKEN, token.expose_secret().to_owned()));
        }
        if let Some(token) = &session.refresh_token {
            entries.push((KEY_REFRESH_TOKEN, token.expose_secret().to_owned()));
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM session").execute(&mut *tx).await?;
        for (key, value) in entries {
            sqlx::query("INSERT INTO session (key, value) VALUES (?1, ?2)")
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Load the stored session, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the block is incomplete.
    pub async fn load(&self) -> Result<Option<Session>, RepositoryError> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM session")
            .fetch_all(self.pool)
            .await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let mut values: HashMap<String, String> = rows.into_iter().collect();
        let mut required = |key: &str| {
            values
                .remove(key)
                .ok_or_else(|| RepositoryError::DataCorruption(format!("session missing {key}")))
        };

        let user_id: UserId = required(KEY_USER_ID)?
            .parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid session user: {e}")))?;
        let email = Email::parse(&required(KEY_EMAIL)?)
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid session email: {e}")))?;
        let is_admin = required(KEY_IS_ADMIN)? == "true";

        Ok(Some(Session {
            user_id,
            email,
            access_token: values.remove(KEY_ACCESS_TOKEN).map(SecretString::from),
            refresh_token: values.remove(KEY_REFRESH_TOKEN).map(SecretString::from),
            is_admin,
        }))
    }

    /// Delete the stored session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM session")
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn session(token: Option<&str>) -> Session {
        Session {
            user_id: UserId::new(7),
            email: Email::parse("admin@keylab.com").unwrap(),
            access_token: token.map(SecretString::from),
            refresh_token: None,
            is_admin: true,
        }
    }

    #[tokio::test]
    async fn test_load_empty() {
        let pool = test_pool().await;
        assert!(SessionRepository::new(&pool).load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_load_clear() {
        let pool = test_pool().await;
        let repo = SessionRepository::new(&pool);
        repo.save(&session(Some("jwt-token"))).await.unwrap();

        let loaded = repo.load().await.unwrap().unwrap();
        assert_eq!(loaded.user_id, UserId::new(7));
        assert!(loaded.is_admin);
        assert_eq!(
            loaded.access_token.as_ref().map(|t| t.expose_secret().to_owned()),
            Some("jwt-token".to_string())
        );
        assert!(loaded.refresh_token.is_none());

        repo.clear().await.unwrap();
        assert!(repo.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_replaces_previous_tokens() {
        let pool = test_pool().await;
        let repo = SessionRepository::new(&pool);
        repo.save(&session(Some("old"))).await.unwrap();
        repo.save(&session(None)).await.unwrap();

        let loaded = repo.load().await.unwrap().unwrap();
        assert!(loaded.access_token.is_none());
        assert!(!loaded.is_online());
    }

    #[tokio::test]
    async fn test_incomplete_block_is_corruption() {
        let pool = test_pool().await;
        sqlx::query("INSERT INTO session (key, value) VALUES ('email', 'a@b.cl')")
            .execute(&pool)
            .await
            .unwrap();
        assert!(matches!(
            SessionRepository::new(&pool).load().await,
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}
