//! Shipping addresses of the signed-in user.

use keylab_core::AddressId;

use crate::db::AddressRepository;
use crate::error::AppError;
use crate::models::{Address, NewAddress, Session};
use crate::state::AppState;

/// Address book operations.
pub struct AddressService<'a> {
    state: &'a AppState,
}

impl<'a> AddressService<'a> {
    /// Create a new address service.
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    fn repo(&self) -> AddressRepository<'_> {
        AddressRepository::new(self.state.pool())
    }

    /// The signed-in user's addresses, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotLoggedIn` without a session.
    pub async fn list(&self) -> Result<Vec<Address>, AppError> {
        let session = self.state.require_session().await?;
        Ok(self.repo().list_for_user(session.user_id).await?)
    }

    /// Save a new address.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if a required field is blank.
    pub async fn add(&self, address: NewAddress) -> Result<Address, AppError> {
        let session = self.state.require_session().await?;
        let address = validated(address)?;
        Ok(self.repo().create(session.user_id, &address).await?)
    }

    /// Overwrite one of the user's addresses.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user has no such address.
    pub async fn update(&self, id: AddressId, address: NewAddress) -> Result<Address, AppError> {
        let session = self.state.require_session().await?;
        let address = validated(address)?;
        self.require_owned(&session, id).await?;
        Ok(self.repo().update(id, &address).await?)
    }

    /// Delete one of the user's addresses.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user has no such address.
    pub async fn delete(&self, id: AddressId) -> Result<(), AppError> {
        let session = self.state.require_session().await?;
        self.require_owned(&session, id).await?;
        self.repo().delete_by_id(id).await?;
        Ok(())
    }

    async fn require_owned(&self, session: &Session, id: AddressId) -> Result<Address, AppError> {
        self.repo()
            .get_by_id(id)
            .await?
            .filter(|a| a.user_id == session.user_id)
            .ok_or_else(|| AppError::NotFound(format!("address {id}")))
    }
}

fn validated(address: NewAddress) -> Result<NewAddress, AppError> {
    address.validate().map_err(AppError::Validation)?;
    Ok(address.normalized())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use keylab_core::{Email, UserId};

    use super::*;
    use crate::db::{SessionRepository, UserRepository};
    use crate::models::NewUser;
    use crate::models::address::DEFAULT_REGION;
    use crate::state::test_state;

    async fn sign_in(state: &AppState, email: &str) -> UserId {
        let email = Email::parse(email).unwrap();
        let user = UserRepository::new(state.pool())
            .create(&NewUser {
                name: "Ana".to_string(),
                email: email.clone(),
                password_hash: None,
                avatar_url: None,
            })
            .await
            .unwrap();
        SessionRepository::new(state.pool())
            .save(&Session {
                user_id: user.id,
                email,
                access_token: None,
                refresh_token: None,
                is_admin: false,
            })
            .await
            .unwrap();
        user.id
    }

    fn form() -> NewAddress {
        NewAddress {
            alias: " Casa ".to_string(),
            street: "Av. Providencia".to_string(),
            number: "1234".to_string(),
            apartment: Some(String::new()),
            commune: "Providencia".to_string(),
            region: None,
            phone: "+56912345678".to_string(),
        }
    }

    #[tokio::test]
    async fn test_add_normalizes_and_lists() {
        let state = test_state("http://127.0.0.1:1").await;
        sign_in(&state, "ana@example.com").await;
        let addresses = AddressService::new(&state);

        let saved = addresses.add(form()).await.unwrap();
        assert_eq!(saved.alias, "Casa");
        assert_eq!(saved.apartment, None);
        assert_eq!(saved.region, DEFAULT_REGION);
        assert_eq!(addresses.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_required_field_rejected() {
        let state = test_state("http://127.0.0.1:1").await;
        sign_in(&state, "ana@example.com").await;
        let mut bad = form();
        bad.phone = "  ".to_string();
        assert!(matches!(
            AddressService::new(&state).add(bad).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_cannot_touch_other_users_address() {
        let state = test_state("http://127.0.0.1:1").await;
        sign_in(&state, "ana@example.com").await;
        let addresses = AddressService::new(&state);
        let anas = addresses.add(form()).await.unwrap();

        sign_in(&state, "beto@example.com").await;
        assert!(matches!(
            addresses.delete(anas.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            addresses.update(anas.id, form()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(addresses.list().await.unwrap().is_empty());
    }
}
