//! Authentication service.
//!
//! Accounts live in the backend; every successful remote sign-in is mirrored
//! into the local `users` table (with an argon2 hash of the password) so that
//! [`AuthService::login_offline`] works without a connection.
//!
//! Admin rights are derived from the email domain, see
//! [`StorefrontConfig::admin_domain`](crate::config::StorefrontConfig).

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use secrecy::SecretString;
use tracing::{info, instrument};

use keylab_core::{Email, validate_password};

use crate::backend::RemoteError;
use crate::backend::types::AuthSession;
use crate::db::{RepositoryError, SessionRepository, UserRepository};
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::models::{NewUser, Session, User};
use crate::state::AppState;

/// Name given to identity-provider accounts that carry no profile name.
pub const FALLBACK_PROVIDER_NAME: &str = "Google User";

/// Authentication service.
///
/// Handles registration, remote and offline login, and the session block.
pub struct AuthService<'a> {
    state: &'a AppState,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    fn users(&self) -> UserRepository<'_> {
        UserRepository::new(self.state.pool())
    }

    fn is_admin(&self, email: &Email) -> bool {
        email.has_domain(&self.state.config().admin_domain)
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a new account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::EmptyName`, `AuthError::InvalidEmail`,
    /// `AuthError::WeakPassword`, or `AuthError::PasswordMismatch` for bad
    /// input; `AuthError::UserAlreadyExists` if the email is known locally;
    /// `AuthError::Rejected` if the backend refuses the sign-up.
    #[instrument(skip(self, password, confirmation))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<User, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::EmptyName.into());
        }
        let email = Email::parse(email.trim()).map_err(AuthError::from)?;
        validate_password(password).map_err(AuthError::from)?;
        if password != confirmation {
            return Err(AuthError::PasswordMismatch.into());
        }
        if self.users().email_exists(&email).await? {
            return Err(AuthError::UserAlreadyExists.into());
        }

        let response = self
            .state
            .backend()
            .auth
            .sign_up(name, email.as_str(), &SecretString::from(password))
            .await
            .map_err(AuthError::from)?;

        let user = self
            .users()
            .create(&NewUser {
                name: name.to_string(),
                email: email.clone(),
                password_hash: Some(hash_password(password)?),
                avatar_url: None,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AppError::from(AuthError::UserAlreadyExists),
                other => other.into(),
            })?;

        self.start_session(&user, response.session()).await?;
        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Sign in against the backend with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the backend rejects the
    /// credentials, or `AuthError::Remote` if it cannot be reached.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AppError> {
        let email = Email::parse(email.trim()).map_err(AuthError::from)?;
        validate_password(password).map_err(AuthError::from)?;

        let remote = self
            .state
            .backend()
            .auth
            .sign_in_with_password(email.as_str(), &SecretString::from(password))
            .await
            .map_err(|e| match e {
                RemoteError::Status { status: 400 | 401, .. } => AuthError::InvalidCredentials,
                other => AuthError::from(other),
            })?;

        let existing = self.users().get_by_email(&email).await?;
        let name = remote
            .user
            .user_metadata
            .display_name()
            .map(str::to_string)
            .or_else(|| existing.map(|u| u.name))
            .unwrap_or_else(|| email.local_part().to_string());

        let user = self
            .users()
            .upsert_by_email(&NewUser {
                name,
                email,
                password_hash: Some(hash_password(password)?),
                avatar_url: remote.user.user_metadata.avatar().map(str::to_string),
            })
            .await?;

        self.start_session(&user, Some(&remote)).await?;
        info!(user_id = %user.id, "User logged in");
        Ok(user)
    }

    /// Sign in using only the local cache.
    ///
    /// The resulting session has no backend tokens.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the user is unknown, has no
    /// local password, or the password does not match.
    #[instrument(skip(self, password))]
    pub async fn login_offline(&self, email: &str, password: &str) -> Result<User, AppError> {
        let email = Email::parse(email.trim()).map_err(AuthError::from)?;

        let user = self
            .users()
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let hash = user
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, hash)?;

        self.start_session(&user, None).await?;
        info!(user_id = %user.id, "User logged in offline");
        Ok(user)
    }

    /// Sign in with an identity-provider id token.
    ///
    /// A returning user keeps their local password and registration date;
    /// name and avatar are refreshed from the provider profile.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Rejected` if the backend refuses the token or the
    /// profile carries no usable email.
    #[instrument(skip(self, id_token))]
    pub async fn login_with_id_token(&self, id_token: &str) -> Result<User, AppError> {
        let remote = self
            .state
            .backend()
            .auth
            .sign_in_with_id_token(&SecretString::from(id_token))
            .await
            .map_err(AuthError::from)?;

        let email = remote
            .user
            .email
            .as_deref()
            .ok_or_else(|| AuthError::Rejected("identity provider returned no email".to_string()))
            .and_then(|e| Email::parse(e).map_err(AuthError::from))?;

        let metadata = &remote.user.user_metadata;
        let user = self
            .users()
            .upsert_by_email(&NewUser {
                name: metadata
                    .display_name()
                    .unwrap_or(FALLBACK_PROVIDER_NAME)
                    .to_string(),
                email,
                password_hash: None,
                avatar_url: metadata.avatar().map(str::to_string),
            })
            .await?;

        self.start_session(&user, Some(&remote)).await?;
        info!(user_id = %user.id, "User logged in with identity provider");
        Ok(user)
    }

    /// Ask the backend to send a password reset email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` for a malformed address, or a remote
    /// error if the request fails.
    #[instrument(skip(self))]
    pub async fn recover_password(&self, email: &str) -> Result<(), AppError> {
        let email = Email::parse(email.trim()).map_err(AuthError::from)?;
        self.state
            .backend()
            .auth
            .recover_password(email.as_str())
            .await
            .map_err(AuthError::from)?;
        Ok(())
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Forget the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the session block cannot be cleared.
    pub async fn logout(&self) -> Result<(), AppError> {
        SessionRepository::new(self.state.pool()).clear().await?;
        clear_sentry_user();
        info!("User logged out");
        Ok(())
    }

    /// The stored session, if any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the session block cannot be read.
    pub async fn current_session(&self) -> Result<Option<Session>, AppError> {
        self.state.session().await
    }

    /// The signed-in user's record, if any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the cache cannot be read.
    pub async fn current_user(&self) -> Result<Option<User>, AppError> {
        match self.state.session().await? {
            Some(session) => Ok(self.users().get_by_id(session.user_id).await?),
            None => Ok(None),
        }
    }

    async fn start_session(&self, user: &User, remote: Option<&AuthSession>) -> Result<(), AppError> {
        let session = Session {
            user_id: user.id,
            email: user.email.clone(),
            access_token: remote.map(|r| SecretString::from(r.access_token.clone())),
            refresh_token: remote
                .and_then(|r| r.refresh_token.clone())
                .map(SecretString::from),
            is_admin: self.is_admin(&user.email),
        };
        SessionRepository::new(self.state.pool())
            .save(&session)
            .await?;
        set_sentry_user(&user.id, Some(user.email.as_str()));
        Ok(())
    }
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
