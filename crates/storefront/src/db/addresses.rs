//! Address repository.

use sqlx::SqlitePool;

use keylab_core::{AddressId, UserId};

use super::RepositoryError;
use crate::models::address::DEFAULT_REGION;
use crate::models::{Address, NewAddress};

const SELECT_ADDRESS: &str = r"
    SELECT id, user_id, alias, street, number, apartment, commune, region, phone
    FROM addresses
";

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: i64,
    user_id: i64,
    alias: String,
    street: String,
    number: String,
    apartment: Option<String>,
    commune: String,
    region: String,
    phone: String,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: AddressId::new(row.id),
            user_id: UserId::new(row.user_id),
            alias: row.alias,
            street: row.street,
            number: row.number,
            apartment: row.apartment,
            commune: row.commune,
            region: row.region,
            phone: row.phone,
        }
    }
}

/// Repository for shipping addresses.
pub struct AddressRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Addresses of `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let rows: Vec<AddressRow> =
            sqlx::query_as(&format!("{SELECT_ADDRESS} WHERE user_id = ?1 ORDER BY id DESC"))
                .bind(user_id.as_i64())
                .fetch_all(self.pool)
                .await?;
        Ok(rows.into_iter().map(Address::from).collect())
    }

    /// Get an address by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        let row: Option<AddressRow> = sqlx::query_as(&format!("{SELECT_ADDRESS} WHERE id = ?1"))
            .bind(id.as_i64())
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Address::from))
    }

    /// Save a new address for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails (including an
    /// unknown user).
    pub async fn create(
        &self,
        user_id: UserId,
        address: &NewAddress,
    ) -> Result<Address, RepositoryError> {
        let id = sqlx::query(
            r"
            INSERT INTO addresses (user_id, alias, street, number, apartment, commune, region, phone)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(user_id.as_i64())
        .bind(&address.alias)
        .bind(&address.street)
        .bind(&address.number)
        .bind(&address.apartment)
        .bind(&address.commune)
        .bind(address.region.as_deref().unwrap_or(DEFAULT_REGION))
        .bind(&address.phone)
        .execute(self.pool)
        .await?
        .last_insert_rowid();

        self.get_by_id(AddressId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Overwrite an address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no address has this ID.
    /// Returns `RepositoryError::Database` if the write fails.
    pub async fn update(&self, id: AddressId, address: &NewAddress) -> Result<Address, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE addresses
            SET alias = ?2, street = ?3, number = ?4, apartment = ?5,
                commune = ?6, region = ?7, phone = ?8
            WHERE id = ?1
            ",
        )
        .bind(id.as_i64())
        .bind(&address.alias)
        .bind(&address.street)
        .bind(&address.number)
        .bind(&address.apartment)
        .bind(&address.commune)
        .bind(address.region.as_deref().unwrap_or(DEFAULT_REGION))
        .bind(&address.phone)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete an address. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_by_id(&self, id: AddressId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = ?1")
            .bind(id.as_i64())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use keylab_core::Email;

    use super::*;
    use crate::db::{UserRepository, test_pool};
    use crate::models::NewUser;

    async fn user(pool: &SqlitePool) -> UserId {
        UserRepository::new(pool)
            .create(&NewUser {
                name: "Ana".to_string(),
                email: Email::parse("ana@example.com").unwrap(),
                password_hash: None,
                avatar_url: None,
            })
            .await
            .unwrap()
            .id
    }

    fn form(alias: &str) -> NewAddress {
        NewAddress {
            alias: alias.to_string(),
            street: "Av. Providencia".to_string(),
            number: "1234".to_string(),
            apartment: None,
            commune: "Providencia".to_string(),
            region: None,
            phone: "+56912345678".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_uses_default_region() {
        let pool = test_pool().await;
        let user_id = user(&pool).await;
        let repo = AddressRepository::new(&pool);

        let address = repo.create(user_id, &form("Casa")).await.unwrap();
        assert_eq!(address.region, DEFAULT_REGION);
        assert_eq!(address.user_id, user_id);
    }

    #[tokio::test]
    async fn test_list_update_delete() {
        let pool = test_pool().await;
        let user_id = user(&pool).await;
        let repo = AddressRepository::new(&pool);

        let casa = repo.create(user_id, &form("Casa")).await.unwrap();
        let oficina = repo.create(user_id, &form("Oficina")).await.unwrap();

        let aliases: Vec<String> = repo
            .list_for_user(user_id)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.alias)
            .collect();
        assert_eq!(aliases, vec!["Oficina", "Casa"]);

        let mut edit = form("Casa");
        edit.apartment = Some("502".to_string());
        let updated = repo.update(casa.id, &edit).await.unwrap();
        assert_eq!(updated.apartment.as_deref(), Some("502"));

        assert!(repo.delete_by_id(oficina.id).await.unwrap());
        assert_eq!(repo.list_for_user(user_id).await.unwrap().len(), 1);
        assert!(matches!(
            repo.update(oficina.id, &edit).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_unknown_user_rejected() {
        let pool = test_pool().await;
        let repo = AddressRepository::new(&pool);
        assert!(repo.create(UserId::new(77), &form("Casa")).await.is_err());
    }
}
