//! Admin catalog management against the fake backend.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use keylab_core::{Price, ProductId};
use keylab_integration_tests::FakeBackend;
use keylab_storefront::error::AppError;
use keylab_storefront::models::ProductDraft;
use keylab_storefront::services::{AdminService, AuthService, CatalogService};
use keylab_storefront::state::AppState;

fn draft(name: &str, price: i64) -> ProductDraft {
    ProductDraft {
        name: name.to_string(),
        price: Price::from_whole(price),
        category: "Teclados".to_string(),
        subcategory: Some("75%".to_string()),
        description: Some("Hot-swap, gasket mount".to_string()),
        stock: 5,
        image_url: None,
    }
}

async fn signed_in(backend: &FakeBackend, email: &str) -> AppState {
    backend.add_account(email, "secreto1", Some("Equipo KeyLab"));
    let state = backend.app_state().await;
    AuthService::new(&state).login(email, "secreto1").await.unwrap();
    state
}

#[tokio::test]
async fn test_admin_product_lifecycle() {
    let backend = FakeBackend::spawn().await;
    let state = signed_in(&backend, "jefe@keylab.com").await;
    let admin = AdminService::new(&state);
    let catalog = CatalogService::new(&state);

    let created = admin
        .create_product(draft("  Teclado K75  ", 45_990))
        .await
        .unwrap();
    assert_eq!(created.name, "Teclado K75");
    assert_eq!(backend.data().products.len(), 1);
    assert_eq!(
        catalog.product(created.id).await.unwrap().unwrap().name,
        "Teclado K75"
    );

    let mut changes = draft("Teclado K75", 39_990);
    changes.stock = 2;
    let updated = admin.update_product(created.id, changes).await.unwrap();
    assert_eq!(updated.price, Price::from_whole(39_990));
    assert_eq!(backend.data().products[0].stock, 2);
    assert_eq!(
        catalog.product(created.id).await.unwrap().unwrap().stock,
        2
    );

    admin.delete_product(created.id).await.unwrap();
    assert!(backend.data().products.is_empty());
    assert!(catalog.product(created.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_invalid_draft_never_reaches_backend() {
    let backend = FakeBackend::spawn().await;
    let state = signed_in(&backend, "jefe@keylab.com").await;

    let result = AdminService::new(&state)
        .create_product(draft(" ", 45_990))
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(backend.data().products.is_empty());
}

#[tokio::test]
async fn test_non_admin_is_forbidden() {
    let backend = FakeBackend::spawn().await;
    let state = signed_in(&backend, "ana@example.com").await;
    let admin = AdminService::new(&state);

    assert!(matches!(
        admin.create_product(draft("Teclado", 45_990)).await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(admin.users().await, Err(AppError::Forbidden(_))));
    assert!(matches!(
        admin.delete_product(ProductId::new(1)).await,
        Err(AppError::Forbidden(_))
    ));
}

#[tokio::test]
async fn test_offline_admin_cannot_write() {
    let backend = FakeBackend::spawn().await;
    let state = signed_in(&backend, "jefe@keylab.com").await;
    let auth = AuthService::new(&state);
    auth.logout().await.unwrap();
    auth.login_offline("jefe@keylab.com", "secreto1").await.unwrap();

    let result = AdminService::new(&state)
        .create_product(draft("Teclado", 45_990))
        .await;
    assert!(matches!(result, Err(AppError::Remote(_))));
    assert!(backend.data().products.is_empty());
}

#[tokio::test]
async fn test_upload_image_returns_public_url() {
    let backend = FakeBackend::spawn().await;
    let state = signed_in(&backend, "jefe@keylab.com").await;

    let url = AdminService::new(&state)
        .upload_image("teclado k75.png", vec![0x89, 0x50, 0x4e, 0x47], "image/png")
        .await
        .unwrap();

    let uploads = backend.data().uploads.clone();
    assert_eq!(uploads.len(), 1);
    assert!(uploads[0].path.starts_with("productos/"));
    assert!(uploads[0].path.ends_with("_teclado_k75.png"));
    assert_eq!(uploads[0].content_type, "image/png");
    assert_eq!(uploads[0].size, 4);
    assert!(url.starts_with(&format!("{}/storage/v1/object/public/productos/", backend.base_url)));
}

#[tokio::test]
async fn test_admin_lists_users() {
    let backend = FakeBackend::spawn().await;
    let state = signed_in(&backend, "jefe@keylab.com").await;

    let users = AdminService::new(&state).users().await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].email.as_str(), "jefe@keylab.com");
}
