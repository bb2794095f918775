//! Integration tests for the KeyLab storefront.
//!
//! Each test spins up [`FakeBackend`], an in-process `axum` server that
//! speaks the subset of the REST, auth, and storage APIs the storefront
//! uses, and points a fresh in-memory [`AppState`] at it.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p keylab-integration-tests
//! ```
//!
//! # Fake backend behaviour
//!
//! - `GET /rest/v1/productos` honours `id=eq.`, `categoria=eq.` and
//!   `nombre=ilike.*text*` filters
//! - Product writes and storage uploads require a bearer token issued by the
//!   fake auth endpoints; the anonymous key alone gets `401`
//! - `POST /auth/v1/token?grant_type=id_token` accepts only
//!   [`GOOGLE_ID_TOKEN`]

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use keylab_core::Price;
use keylab_storefront::backend::types::{ProductPayload, ProductRecord};
use keylab_storefront::config::{BackendConfig, StorefrontConfig};
use keylab_storefront::state::AppState;
use secrecy::SecretString;
use serde_json::{Value, json};

/// The anonymous key every test client is configured with.
pub const ANON_KEY: &str = "test-anon-key";

/// The only id token the fake identity provider accepts.
pub const GOOGLE_ID_TOKEN: &str = "google-id-token-ok";

/// Email of the account behind [`GOOGLE_ID_TOKEN`].
pub const GOOGLE_EMAIL: &str = "gamer@gmail.com";

/// A registered backend account.
#[derive(Debug, Clone)]
pub struct Account {
    pub password: String,
    pub full_name: Option<String>,
}

/// A stored upload.
#[derive(Debug, Clone)]
pub struct Upload {
    pub path: String,
    pub content_type: String,
    pub size: usize,
}

/// Mutable backend contents, shared between the server and the test.
#[derive(Debug, Default)]
pub struct FakeData {
    pub products: Vec<ProductRecord>,
    pub accounts: HashMap<String, Account>,
    pub uploads: Vec<Upload>,
    pub recover_requests: Vec<String>,
    /// When set, catalog reads answer `500`.
    pub fail_catalog: bool,
    /// When set, user tokens are rejected as expired; the anon key still works.
    pub expired_tokens: bool,
    next_product_id: i64,
}

type Shared = Arc<Mutex<FakeData>>;

/// A running fake backend.
pub struct FakeBackend {
    /// Base URL to configure the storefront with.
    pub base_url: String,
    data: Shared,
}

impl FakeBackend {
    /// Start the server on an ephemeral port.
    pub async fn spawn() -> Self {
        let data: Shared = Arc::new(Mutex::new(FakeData {
            next_product_id: 1,
            ..FakeData::default()
        }));

        let app = Router::new()
            .route(
                "/rest/v1/productos",
                get(list_products)
                    .post(create_product)
                    .patch(update_product)
                    .delete(delete_product),
            )
            .route("/auth/v1/token", post(token))
            .route("/auth/v1/signup", post(sign_up))
            .route("/auth/v1/recover", post(recover))
            .route("/storage/v1/object/{*path}", put(upload))
            .with_state(Arc::clone(&data));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake backend");
        });

        Self {
            base_url: format!("http://{addr}"),
            data,
        }
    }

    /// Lock the backend contents.
    pub fn data(&self) -> MutexGuard<'_, FakeData> {
        self.data.lock().expect("fake backend lock")
    }

    /// Insert a catalog row and return its id.
    pub fn add_product(&self, name: &str, price: i64, category: &str, stock: i32) -> i64 {
        let mut data = self.data();
        let id = data.next_product_id;
        data.next_product_id += 1;
        data.products.push(ProductRecord {
            id,
            name: name.to_string(),
            price: Price::from_whole(price),
            category: category.to_string(),
            subcategory: None,
            description: None,
            stock,
            image_url: Some(format!("{id}.jpg")),
            created_at: Some("2025-01-01T00:00:00+00:00".to_string()),
            updated_at: None,
        });
        id
    }

    /// Register a backend account directly.
    pub fn add_account(&self, email: &str, password: &str, full_name: Option<&str>) {
        self.data().accounts.insert(
            email.to_lowercase(),
            Account {
                password: password.to_string(),
                full_name: full_name.map(str::to_string),
            },
        );
    }

    /// A fresh storefront state with an in-memory cache, pointed at this
    /// backend.
    pub async fn app_state(&self) -> AppState {
        app_state_for(&self.base_url).await
    }
}

/// A storefront state pointed at an arbitrary base URL.
pub async fn app_state_for(base_url: &str) -> AppState {
    let backend = BackendConfig::new(base_url, SecretString::from(ANON_KEY)).expect("backend config");
    let config = StorefrontConfig {
        database_url: "sqlite::memory:".to_string(),
        backend,
        admin_domain: "keylab.com".to_string(),
        sentry_dsn: None,
        sentry_environment: None,
    };
    AppState::connect(config).await.expect("app state")
}

// =============================================================================
// Handlers
// =============================================================================

fn lock(data: &Shared) -> MutexGuard<'_, FakeData> {
    data.lock().expect("fake backend lock")
}

fn filter_value<'a>(params: &'a HashMap<String, String>, key: &str, op: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.strip_prefix(op))
}

fn record_matches(record: &ProductRecord, params: &HashMap<String, String>) -> bool {
    if let Some(id) = filter_value(params, "id", "eq.")
        && record.id.to_string() != id
    {
        return false;
    }
    if let Some(category) = filter_value(params, "categoria", "eq.")
        && record.category != category
    {
        return false;
    }
    if let Some(pattern) = filter_value(params, "nombre", "ilike.") {
        let needle = pattern.trim_matches('*').to_lowercase();
        if !record.name.to_lowercase().contains(&needle) {
            return false;
        }
    }
    true
}

fn is_authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer token-"))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "JWT required"})),
    )
        .into_response()
}

async fn list_products(
    State(data): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let data = lock(&data);
    if data.expired_tokens && is_authorized(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "JWT expired"})),
        )
            .into_response();
    }
    if data.fail_catalog {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "catalog unavailable"})),
        )
            .into_response();
    }
    let rows: Vec<ProductRecord> = data
        .products
        .iter()
        .filter(|p| record_matches(p, &params))
        .cloned()
        .collect();
    Json(rows).into_response()
}

fn record_from(id: i64, payload: ProductPayload) -> ProductRecord {
    ProductRecord {
        id,
        name: payload.name,
        price: payload.price,
        category: payload.category,
        subcategory: payload.subcategory,
        description: payload.description,
        stock: payload.stock,
        image_url: payload.image_url,
        created_at: Some("2025-06-01T12:00:00+00:00".to_string()),
        updated_at: None,
    }
}

async fn create_product(
    State(data): State<Shared>,
    headers: HeaderMap,
    Json(payload): Json<ProductPayload>,
) -> Response {
    if !is_authorized(&headers) {
        return unauthorized();
    }
    let mut data = lock(&data);
    let id = data.next_product_id;
    data.next_product_id += 1;
    let record = record_from(id, payload);
    data.products.push(record.clone());
    (StatusCode::CREATED, Json(vec![record])).into_response()
}

async fn update_product(
    State(data): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    Json(payload): Json<ProductPayload>,
) -> Response {
    if !is_authorized(&headers) {
        return unauthorized();
    }
    let mut data = lock(&data);
    let Some(existing) = data.products.iter_mut().find(|p| record_matches(p, &params)) else {
        return Json(Vec::<ProductRecord>::new()).into_response();
    };
    let mut updated = record_from(existing.id, payload);
    updated.created_at.clone_from(&existing.created_at);
    updated.updated_at = Some("2025-06-02T12:00:00+00:00".to_string());
    *existing = updated.clone();
    Json(vec![updated]).into_response()
}

async fn delete_product(
    State(data): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !is_authorized(&headers) {
        return unauthorized();
    }
    lock(&data).products.retain(|p| !record_matches(p, &params));
    StatusCode::NO_CONTENT.into_response()
}

fn session_json(email: &str, full_name: Option<&str>, picture: Option<&str>) -> Value {
    json!({
        "access_token": format!("token-{email}"),
        "refresh_token": format!("refresh-{email}"),
        "token_type": "bearer",
        "expires_in": 3600,
        "user": {
            "id": format!("uid-{email}"),
            "email": email,
            "user_metadata": {
                "full_name": full_name,
                "picture": picture,
            },
        },
    })
}

async fn token(
    State(data): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    let invalid = |description: &str| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant", "error_description": description})),
        )
            .into_response()
    };

    match params.get("grant_type").map(String::as_str) {
        Some("password") => {
            let email = body["email"].as_str().unwrap_or_default().to_lowercase();
            let password = body["password"].as_str().unwrap_or_default();
            let data = lock(&data);
            match data.accounts.get(&email) {
                Some(account) if account.password == password => {
                    Json(session_json(&email, account.full_name.as_deref(), None)).into_response()
                }
                _ => invalid("Invalid login credentials"),
            }
        }
        Some("id_token") if body["id_token"] == GOOGLE_ID_TOKEN => Json(session_json(
            GOOGLE_EMAIL,
            Some("Gamer Uno"),
            Some("https://lh3.example.com/gamer.png"),
        ))
        .into_response(),
        _ => invalid("Bad ID token"),
    }
}

async fn sign_up(State(data): State<Shared>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default().to_lowercase();
    let password = body["password"].as_str().unwrap_or_default().to_string();
    let full_name = body["data"]["full_name"].as_str().map(str::to_string);

    let mut data = lock(&data);
    if data.accounts.contains_key(&email) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"code": 422, "msg": "User already registered"})),
        )
            .into_response();
    }
    data.accounts.insert(
        email.clone(),
        Account {
            password,
            full_name: full_name.clone(),
        },
    );
    Json(session_json(&email, full_name.as_deref(), None)).into_response()
}

async fn recover(State(data): State<Shared>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    lock(&data).recover_requests.push(email);
    Json(json!({})).into_response()
}

async fn upload(
    State(data): State<Shared>,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    if !is_authorized(&headers) {
        return unauthorized();
    }
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    lock(&data).uploads.push(Upload {
        path: path.clone(),
        content_type,
        size: body.len(),
    });
    Json(json!({"Key": path})).into_response()
}
