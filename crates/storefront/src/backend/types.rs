//! Wire types for the backend APIs.
//!
//! Catalog field names follow the backend table (`nombre`, `precio`, ...);
//! the Rust side uses English names throughout.

use serde::{Deserialize, Serialize};

use keylab_core::Price;

// =============================================================================
// REST
// =============================================================================

/// A row of the `productos` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "precio")]
    pub price: Price,
    #[serde(rename = "categoria")]
    pub category: String,
    #[serde(rename = "subcategoria", default)]
    pub subcategory: Option<String>,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stock: i32,
    #[serde(rename = "imagen_url", default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Body for product inserts and updates. The backend assigns `id` and the
/// timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPayload {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "precio")]
    pub price: Price,
    #[serde(rename = "categoria")]
    pub category: String,
    #[serde(rename = "subcategoria")]
    pub subcategory: Option<String>,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    pub stock: i32,
    #[serde(rename = "imagen_url")]
    pub image_url: Option<String>,
}

// =============================================================================
// Auth
// =============================================================================

/// Body for the password grant and sign-up.
#[derive(Debug, Serialize)]
pub struct PasswordCredentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<SignUpMetadata<'a>>,
}

/// Profile metadata attached at sign-up.
#[derive(Debug, Serialize)]
pub struct SignUpMetadata<'a> {
    pub full_name: &'a str,
}

/// Body for the id-token grant.
#[derive(Debug, Serialize)]
pub struct IdTokenCredentials<'a> {
    pub id_token: &'a str,
    pub provider: &'a str,
}

/// Body for password recovery.
#[derive(Debug, Serialize)]
pub struct RecoverRequest<'a> {
    pub email: &'a str,
}

/// A successful token grant.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: AuthUser,
}

/// The user record returned by the auth API.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// Identity-provider profile fields. Providers disagree on the key names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

impl UserMetadata {
    /// `full_name`, then `name`, ignoring blanks.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        [&self.full_name, &self.name]
            .into_iter()
            .filter_map(Option::as_deref)
            .map(str::trim)
            .find(|s| !s.is_empty())
    }

    /// `avatar_url`, then `picture`, ignoring blanks.
    #[must_use]
    pub fn avatar(&self) -> Option<&str> {
        [&self.avatar_url, &self.picture]
            .into_iter()
            .filter_map(Option::as_deref)
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

/// Sign-up returns a session when email confirmation is off, and just the
/// user when it is on.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(AuthSession),
    User(AuthUser),
}

impl SignUpResponse {
    /// The created user.
    #[must_use]
    pub const fn user(&self) -> &AuthUser {
        match self {
            Self::Session(session) => &session.user,
            Self::User(user) => user,
        }
    }

    /// The session, if the backend signed the user in immediately.
    #[must_use]
    pub const fn session(&self) -> Option<&AuthSession> {
        match self {
            Self::Session(session) => Some(session),
            Self::User(_) => None,
        }
    }
}

// =============================================================================
// Storage
// =============================================================================

/// Response to an object upload.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    #[serde(rename = "Key", default)]
    pub key: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_record_from_backend_json() {
        let json = r#"{
            "id": 12,
            "nombre": "Teclado Keychron K2",
            "precio": 89990.0,
            "categoria": "Teclados",
            "subcategoria": null,
            "descripcion": "Mecánico 75%",
            "stock": 4,
            "imagen_url": "teclados/k2.png",
            "created_at": "2024-05-01T12:00:00+00:00",
            "updated_at": null
        }"#;
        let record: ProductRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.name, "Teclado Keychron K2");
        assert_eq!(record.price, Price::from_whole(89_990));
        assert_eq!(record.image_url.as_deref(), Some("teclados/k2.png"));
        assert!(record.updated_at.is_none());
    }

    #[test]
    fn test_product_record_tolerates_missing_optionals() {
        let json = r#"{"id": 1, "nombre": "X", "precio": 10, "categoria": "C"}"#;
        let record: ProductRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.stock, 0);
        assert!(record.subcategory.is_none());
    }

    #[test]
    fn test_payload_uses_backend_names() {
        let payload = ProductPayload {
            name: "Switch".to_string(),
            price: Price::from_whole(500),
            category: "Switches".to_string(),
            subcategory: None,
            description: None,
            stock: 100,
            image_url: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["nombre"], "Switch");
        assert_eq!(json["precio"], 500.0);
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_metadata_fallbacks() {
        let meta: UserMetadata =
            serde_json::from_str(r#"{"name": "Ana", "picture": "https://x/p.png"}"#).unwrap();
        assert_eq!(meta.display_name(), Some("Ana"));
        assert_eq!(meta.avatar(), Some("https://x/p.png"));

        let meta: UserMetadata =
            serde_json::from_str(r#"{"full_name": " ", "name": "Ana"}"#).unwrap();
        assert_eq!(meta.display_name(), Some("Ana"));
        assert_eq!(UserMetadata::default().display_name(), None);
    }

    #[test]
    fn test_sign_up_response_shapes() {
        let with_session: SignUpResponse = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"r","user":{"id":"u1","email":"a@b.cl"}}"#,
        )
        .unwrap();
        assert!(with_session.session().is_some());
        assert_eq!(with_session.user().id, "u1");

        let user_only: SignUpResponse =
            serde_json::from_str(r#"{"id":"u2","email":"a@b.cl","user_metadata":{}}"#).unwrap();
        assert!(user_only.session().is_none());
        assert_eq!(user_only.user().id, "u2");
    }
}
