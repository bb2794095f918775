//! Auth API client.

use std::sync::Arc;

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use super::types::{
    AuthSession, IdTokenCredentials, PasswordCredentials, RecoverRequest, SignUpMetadata,
    SignUpResponse,
};
use super::{ApiContext, HttpCore, RemoteError};

/// Identity provider used for id-token sign-in.
pub const GOOGLE_PROVIDER: &str = "google";

/// Client for the auth API.
#[derive(Clone)]
pub struct AuthClient {
    core: Arc<HttpCore>,
}

impl AuthClient {
    pub(crate) const fn from_core(core: Arc<HttpCore>) -> Self {
        Self { core }
    }

    fn token_url(&self, grant_type: &str) -> Result<url::Url, RemoteError> {
        let mut url = self.core.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        Ok(url)
    }

    /// Exchange email and password for a session.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Status` with status 400 for bad credentials.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthSession, RemoteError> {
        let url = self.token_url("password")?;
        let body = PasswordCredentials {
            email,
            password: password.expose_secret(),
            data: None,
        };
        let request = self
            .core
            .request(Method::POST, url, &ApiContext::anonymous())
            .json(&body);
        self.core.send_json(request).await
    }

    /// Exchange an identity-provider id token for a session.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the backend rejects the token.
    #[instrument(skip(self, id_token))]
    pub async fn sign_in_with_id_token(
        &self,
        id_token: &SecretString,
    ) -> Result<AuthSession, RemoteError> {
        let url = self.token_url("id_token")?;
        let body = IdTokenCredentials {
            id_token: id_token.expose_secret(),
            provider: GOOGLE_PROVIDER,
        };
        let request = self
            .core
            .request(Method::POST, url, &ApiContext::anonymous())
            .json(&body);
        self.core.send_json(request).await
    }

    /// Create an account. `full_name` is stored as profile metadata.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Status` if the backend rejects the sign-up
    /// (e.g. the email is already registered).
    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        full_name: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<SignUpResponse, RemoteError> {
        let url = self.core.endpoint("auth/v1/signup")?;
        let body = PasswordCredentials {
            email,
            password: password.expose_secret(),
            data: Some(SignUpMetadata { full_name }),
        };
        let request = self
            .core
            .request(Method::POST, url, &ApiContext::anonymous())
            .json(&body);
        self.core.send_json(request).await
    }

    /// Ask the backend to email a password reset link.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on transport failure or non-success status.
    #[instrument(skip(self))]
    pub async fn recover_password(&self, email: &str) -> Result<(), RemoteError> {
        let url = self.core.endpoint("auth/v1/recover")?;
        let request = self
            .core
            .request(Method::POST, url, &ApiContext::anonymous())
            .json(&RecoverRequest { email });
        self.core.send(request).await?;
        Ok(())
    }
}
