//! Clients for the remote backend.
//!
//! # APIs
//!
//! ## REST (`/rest/v1/`)
//! - Catalog table `productos`, filtered with `column=eq.value`
//! - Writes ask for `Prefer: return=representation` and read the first row back
//!
//! ## Auth (`/auth/v1/`)
//! - Password and id-token grants, sign-up, password recovery
//!
//! ## Storage (`/storage/v1/object/`)
//! - Product image uploads and public URLs
//!
//! Every request carries the anon key as `apikey`. The bearer token is the
//! signed-in user's access token when the caller's [`ApiContext`] has one,
//! and the anon key otherwise.
//!
//! # Example
//!
//! ```rust,ignore
//! use keylab_storefront::backend::{ApiContext, Backend};
//!
//! let backend = Backend::new(&config.backend)?;
//! let products = backend.rest.fetch_products(&ApiContext::anonymous()).await?;
//! ```

pub mod auth;
pub mod conversions;
pub mod rest;
pub mod storage;
pub mod types;

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

pub use auth::AuthClient;
pub use rest::RestClient;
pub use storage::StorageClient;

use crate::config::BackendConfig;
use crate::models::Session;

/// Longest slice of a response body kept in errors and logs.
const BODY_PREVIEW_CHARS: usize = 500;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Transport failure: DNS, connect, TLS, timeout.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    /// A write succeeded but returned no representation.
    #[error("empty response from backend")]
    EmptyResponse,

    /// The response body could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A request URL could not be built.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl RemoteError {
    /// HTTP status, when the backend returned one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Per-call context for backend requests.
///
/// Carries the signed-in user's access token, if any. Passed explicitly to
/// every client method instead of living in a global.
#[derive(Debug, Clone, Default)]
pub struct ApiContext {
    access_token: Option<SecretString>,
}

impl ApiContext {
    /// Context for unauthenticated calls (the anon key is the bearer).
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Context that authenticates as the holder of `token`.
    #[must_use]
    pub const fn with_token(token: SecretString) -> Self {
        Self {
            access_token: Some(token),
        }
    }

    /// Context for the given session, falling back to anonymous when the
    /// session has no token.
    #[must_use]
    pub fn for_session(session: Option<&Session>) -> Self {
        Self {
            access_token: session.and_then(|s| s.access_token.clone()),
        }
    }

    /// Whether a user token is present.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}

/// All backend clients, sharing one connection pool.
#[derive(Clone)]
pub struct Backend {
    pub rest: RestClient,
    pub auth: AuthClient,
    pub storage: StorageClient,
}

impl Backend {
    /// Build the clients from configuration.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the HTTP client cannot be built or the API key
    /// is not a valid header value.
    pub fn new(config: &BackendConfig) -> Result<Self, RemoteError> {
        let core = Arc::new(HttpCore::new(config)?);
        Ok(Self {
            rest: RestClient::from_core(Arc::clone(&core)),
            auth: AuthClient::from_core(Arc::clone(&core)),
            storage: StorageClient::from_core(core),
        })
    }
}

/// Shared HTTP plumbing for the three clients.
pub(crate) struct HttpCore {
    client: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
    storage_bucket: String,
}

impl HttpCore {
    fn new(config: &BackendConfig) -> Result<Self, RemoteError> {
        let mut headers = HeaderMap::new();
        let mut api_key = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|e| RemoteError::Parse(format!("Invalid API key format: {e}")))?;
        api_key.set_sensitive(true);
        headers.insert("apikey", api_key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        // Joining relative paths onto a base only keeps its last segment when
        // the path ends in '/'.
        let mut base_url = config.base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            storage_bucket: config.storage_bucket.clone(),
        })
    }

    /// Resolve a path relative to the backend base URL.
    fn endpoint(&self, path: &str) -> Result<Url, RemoteError> {
        self.base_url
            .join(path)
            .map_err(|e| RemoteError::InvalidUrl(format!("{path}: {e}")))
    }

    /// Start a request with the bearer token for `ctx`.
    fn request(&self, method: Method, url: Url, ctx: &ApiContext) -> RequestBuilder {
        let token = ctx
            .access_token
            .as_ref()
            .unwrap_or(&self.api_key)
            .expose_secret();
        self.client
            .request(method, url)
            .bearer_auth(token)
    }

    /// Send a request and decode a JSON body.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RemoteError> {
        let response = self.send(request).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %preview(&body),
                "Failed to parse backend response"
            );
            RemoteError::Parse(e.to_string())
        })
    }

    /// Send a request, mapping non-success statuses to `RemoteError::Status`.
    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = %status,
                body = %preview(&body),
                "Backend returned non-success status"
            );
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message: error_message(&body).unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                }),
            });
        }

        Ok(response)
    }
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

/// Pull a human-readable message out of an error body.
///
/// The REST API uses `message`, the auth API uses `msg` or
/// `error_description`, and storage uses `error`.
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        return Some(preview(trimmed));
    };

    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(serde_json::Value::as_str))
        .map(str::to_string)
        .or_else(|| Some(preview(trimmed)))
}
