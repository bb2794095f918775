//! Admin catalog management.
//!
//! Writes go to the backend first; the local cache is only touched after the
//! backend accepted the change.

use chrono::Utc;
use tracing::{info, instrument};

use keylab_core::ProductId;

use crate::backend::ApiContext;
use crate::backend::conversions::convert_product;
use crate::backend::types::ProductPayload;
use crate::db::{ProductRepository, UserRepository};
use crate::error::AppError;
use crate::models::{Product, ProductDraft, User};
use crate::state::AppState;

/// Product CRUD and image uploads, for admin sessions only.
pub struct AdminService<'a> {
    state: &'a AppState,
}

impl<'a> AdminService<'a> {
    /// Create a new admin service.
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Backend context of the signed-in admin.
    async fn admin_context(&self) -> Result<ApiContext, AppError> {
        let session = self.state.require_session().await?;
        if !session.is_admin {
            return Err(AppError::Forbidden(
                "admin access required".to_string(),
            ));
        }
        Ok(ApiContext::for_session(Some(&session)))
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an invalid draft,
    /// `AppError::Forbidden` for non-admins, or `AppError::Remote` if the
    /// backend rejects the write.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create_product(&self, draft: ProductDraft) -> Result<Product, AppError> {
        let draft = validated(draft)?;
        let ctx = self.admin_context().await?;
        let backend = self.state.backend();

        let record = backend
            .rest
            .create_product(&ctx, &ProductPayload::from(&draft))
            .await?;
        let product = convert_product(record, &backend.storage);
        ProductRepository::new(self.state.pool())
            .upsert(&product)
            .await?;

        info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// Overwrite a product.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Remote` with `RemoteError::EmptyResponse` if the
    /// backend has no product with this ID.
    #[instrument(skip(self, draft))]
    pub async fn update_product(
        &self,
        id: ProductId,
        draft: ProductDraft,
    ) -> Result<Product, AppError> {
        let draft = validated(draft)?;
        let ctx = self.admin_context().await?;
        let backend = self.state.backend();

        let record = backend
            .rest
            .update_product(&ctx, id, &ProductPayload::from(&draft))
            .await?;
        let product = convert_product(record, &backend.storage);
        ProductRepository::new(self.state.pool())
            .upsert(&product)
            .await?;

        info!(product_id = %product.id, "Product updated");
        Ok(product)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Remote` if the backend rejects the delete; the
    /// cached row is kept in that case.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), AppError> {
        let ctx = self.admin_context().await?;
        self.state.backend().rest.delete_product(&ctx, id).await?;
        ProductRepository::new(self.state.pool())
            .delete_by_id(id)
            .await?;

        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Upload a product image and return its public URL.
    ///
    /// The object name is prefixed with the upload time so re-uploads of a
    /// file with the same name do not overwrite each other.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an empty file, or
    /// `AppError::Remote` if the upload fails.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload_image(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        if bytes.is_empty() {
            return Err(AppError::Validation("image file is empty".to_string()));
        }
        let ctx = self.admin_context().await?;

        let path = object_name(file_name, Utc::now().timestamp_millis());
        let url = self
            .state
            .backend()
            .storage
            .upload(&ctx, &path, bytes, content_type)
            .await?;

        info!(path = %path, "Product image uploaded");
        Ok(url.into())
    }

    /// Every user known to this device.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for non-admins.
    pub async fn users(&self) -> Result<Vec<User>, AppError> {
        self.admin_context().await?;
        Ok(UserRepository::new(self.state.pool()).list_all().await?)
    }
}

fn validated(draft: ProductDraft) -> Result<ProductDraft, AppError> {
    let draft = draft.normalized();
    draft.validate().map_err(AppError::Validation)?;
    Ok(draft)
}

/// `{millis}_{file name}`, with anything outside `[A-Za-z0-9._-]` replaced.
fn object_name(file_name: &str, millis: i64) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = if cleaned.trim_matches('.').is_empty() {
        "image".to_string()
    } else {
        cleaned
    };
    format!("{millis}_{cleaned}")
}
