//! Catalog administration commands.
//!
//! All of these require a signed-in admin account with backend tokens.
//!
//! # Usage
//!
//! ```bash
//! keylab admin create --name "Teclado 75%" --price 45990 --category Teclados --stock 10
//! keylab admin update 12 --price 39990
//! keylab admin upload-image ./fotos/teclado.jpg
//! keylab admin delete 12
//! ```

use std::path::Path;

use clap::Args;
use keylab_core::{Price, ProductId};
use keylab_storefront::error::AppError;
use keylab_storefront::models::ProductDraft;
use keylab_storefront::services::{AdminService, CatalogService};
use keylab_storefront::state::AppState;
use thiserror::Error;
use tracing::info;

/// Errors specific to admin commands.
#[derive(Debug, Error)]
pub enum AdminCommandError {
    /// A required field was not given on create.
    #[error("Missing required field: --{0}")]
    MissingField(&'static str),

    /// The image file could not be read.
    #[error("Cannot read {path}: {source}")]
    ReadImage {
        path: String,
        source: std::io::Error,
    },

    /// Storefront error.
    #[error(transparent)]
    App(#[from] AppError),
}

/// Product fields accepted by `create` and `update`.
#[derive(Debug, Args)]
pub struct ProductFields {
    #[arg(long)]
    name: Option<String>,
    /// Price in pesos
    #[arg(long, value_parser = parse_price)]
    price: Option<Price>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    subcategory: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    stock: Option<i32>,
    /// Public image URL or storage object path
    #[arg(long)]
    image_url: Option<String>,
}

impl ProductFields {
    /// Overlay the given fields on an existing draft.
    fn apply(self, mut draft: ProductDraft) -> ProductDraft {
        if let Some(name) = self.name {
            draft.name = name;
        }
        if let Some(price) = self.price {
            draft.price = price;
        }
        if let Some(category) = self.category {
            draft.category = category;
        }
        if self.subcategory.is_some() {
            draft.subcategory = self.subcategory;
        }
        if self.description.is_some() {
            draft.description = self.description;
        }
        if let Some(stock) = self.stock {
            draft.stock = stock;
        }
        if self.image_url.is_some() {
            draft.image_url = self.image_url;
        }
        draft
    }

    fn into_draft(self) -> Result<ProductDraft, AdminCommandError> {
        Ok(ProductDraft {
            name: self.name.ok_or(AdminCommandError::MissingField("name"))?,
            price: self.price.ok_or(AdminCommandError::MissingField("price"))?,
            category: self
                .category
                .ok_or(AdminCommandError::MissingField("category"))?,
            subcategory: self.subcategory,
            description: self.description,
            stock: self.stock.unwrap_or(0),
            image_url: self.image_url,
        })
    }
}

/// Create a product.
///
/// # Errors
///
/// Returns `AdminCommandError::MissingField` if name, price, or category is
/// missing, or the storefront error.
pub async fn create(state: &AppState, fields: ProductFields) -> Result<(), AdminCommandError> {
    let product = AdminService::new(state)
        .create_product(fields.into_draft()?)
        .await?;
    info!("Created product #{} {}", product.id, product.name);
    Ok(())
}

/// Update a product, starting from its cached values.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the product is not cached.
pub async fn update(
    state: &AppState,
    id: ProductId,
    fields: ProductFields,
) -> Result<(), AdminCommandError> {
    let current = CatalogService::new(state)
        .product(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
    let draft = fields.apply(ProductDraft::from(&current));

    let product = AdminService::new(state).update_product(id, draft).await?;
    info!("Updated product #{} {}", product.id, product.name);
    Ok(())
}

/// Delete a product.
///
/// # Errors
///
/// Returns the storefront error if the backend rejects the delete.
pub async fn delete(state: &AppState, id: ProductId) -> Result<(), AdminCommandError> {
    AdminService::new(state).delete_product(id).await?;
    info!("Deleted product #{id}");
    Ok(())
}

/// Upload an image file and print its public URL.
///
/// # Errors
///
/// Returns `AdminCommandError::ReadImage` if the file cannot be read.
pub async fn upload_image(state: &AppState, path: &Path) -> Result<(), AdminCommandError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| AdminCommandError::ReadImage {
            path: path.display().to_string(),
            source,
        })?;
    let file_name = path
        .file_name()
        .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().into_owned());

    let url = AdminService::new(state)
        .upload_image(&file_name, bytes, content_type_for(path))
        .await?;
    info!("Uploaded: {url}");
    Ok(())
}

/// List users known to this device.
///
/// # Errors
///
/// Returns `AppError::Forbidden` for non-admins.
pub async fn users(state: &AppState) -> Result<(), AdminCommandError> {
    for user in AdminService::new(state).users().await? {
        info!(
            "#{:<4} {:<30} {}  registered {}",
            user.id.to_string(),
            user.name,
            user.email,
            user.registered_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}

/// Parse a whole or decimal peso amount.
fn parse_price(raw: &str) -> Result<Price, String> {
    raw.parse::<Price>()
        .map_err(|e| format!("invalid price '{raw}': {e}"))
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("jpg" | "jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn empty_fields() -> ProductFields {
        ProductFields {
            name: None,
            price: None,
            category: None,
            subcategory: None,
            description: None,
            stock: None,
            image_url: None,
        }
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("45990").unwrap(), Price::from_whole(45_990));
        assert!(parse_price("caro").is_err());
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a/b.JPG")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("b.png")), "image/png");
        assert_eq!(content_type_for(Path::new("sin_extension")), "application/octet-stream");
    }

    #[test]
    fn test_create_requires_name_price_category() {
        assert!(matches!(
            empty_fields().into_draft(),
            Err(AdminCommandError::MissingField("name"))
        ));

        let draft = ProductFields {
            name: Some("Teclado".to_string()),
            price: Some(Price::from_whole(45_990)),
            category: Some("Teclados".to_string()),
            ..empty_fields()
        }
        .into_draft()
        .unwrap();
        assert_eq!(draft.stock, 0);
    }

    #[test]
    fn test_update_keeps_omitted_fields() {
        let current = ProductDraft {
            name: "Teclado".to_string(),
            price: Price::from_whole(45_990),
            category: "Teclados".to_string(),
            subcategory: Some("75%".to_string()),
            description: None,
            stock: 3,
            image_url: None,
        };
        let draft = ProductFields {
            price: Some(Price::from_whole(39_990)),
            ..empty_fields()
        }
        .apply(current);

        assert_eq!(draft.name, "Teclado");
        assert_eq!(draft.price, Price::from_whole(39_990));
        assert_eq!(draft.subcategory.as_deref(), Some("75%"));
        assert_eq!(draft.stock, 3);
    }
}
