//! REST catalog client.

use std::sync::Arc;

use reqwest::Method;
use tracing::instrument;
use url::Url;

use keylab_core::ProductId;

use super::types::{ProductPayload, ProductRecord};
use super::{ApiContext, HttpCore, RemoteError};

const PRODUCTS_PATH: &str = "rest/v1/productos";

/// Client for the catalog REST API.
#[derive(Clone)]
pub struct RestClient {
    core: Arc<HttpCore>,
}

impl RestClient {
    pub(crate) const fn from_core(core: Arc<HttpCore>) -> Self {
        Self { core }
    }

    fn products_url(&self, filters: &[(&str, String)]) -> Result<Url, RemoteError> {
        let mut url = self.core.endpoint(PRODUCTS_PATH)?;
        if !filters.is_empty() {
            let mut query = url.query_pairs_mut();
            for (column, filter) in filters {
                query.append_pair(column, filter);
            }
        }
        Ok(url)
    }

    /// Every product in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on transport failure, non-success status, or an
    /// undecodable body.
    #[instrument(skip(self, ctx))]
    pub async fn fetch_products(&self, ctx: &ApiContext) -> Result<Vec<ProductRecord>, RemoteError> {
        let url = self.products_url(&[("select", "*".to_string())])?;
        self.core
            .send_json(self.core.request(Method::GET, url, ctx))
            .await
    }

    /// A single product, or `None` if the backend has no such row.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on transport failure, non-success status, or an
    /// undecodable body.
    #[instrument(skip(self, ctx))]
    pub async fn fetch_product(
        &self,
        ctx: &ApiContext,
        id: ProductId,
    ) -> Result<Option<ProductRecord>, RemoteError> {
        let url = self.products_url(&[
            ("id", format!("eq.{id}")),
            ("select", "*".to_string()),
        ])?;
        let rows: Vec<ProductRecord> = self
            .core
            .send_json(self.core.request(Method::GET, url, ctx))
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Products in `category`.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on transport failure, non-success status, or an
    /// undecodable body.
    #[instrument(skip(self, ctx))]
    pub async fn fetch_by_category(
        &self,
        ctx: &ApiContext,
        category: &str,
    ) -> Result<Vec<ProductRecord>, RemoteError> {
        let url = self.products_url(&[
            ("categoria", format!("eq.{category}")),
            ("select", "*".to_string()),
        ])?;
        self.core
            .send_json(self.core.request(Method::GET, url, ctx))
            .await
    }

    /// Products whose name contains `text`, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on transport failure, non-success status, or an
    /// undecodable body.
    #[instrument(skip(self, ctx))]
    pub async fn search_products(
        &self,
        ctx: &ApiContext,
        text: &str,
    ) -> Result<Vec<ProductRecord>, RemoteError> {
        let url = self.products_url(&[
            ("nombre", format!("ilike.*{text}*")),
            ("select", "*".to_string()),
        ])?;
        self.core
            .send_json(self.core.request(Method::GET, url, ctx))
            .await
    }

    /// Insert a product and return the stored row.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::EmptyResponse` if the backend returns no row.
    #[instrument(skip(self, ctx, payload), fields(name = %payload.name))]
    pub async fn create_product(
        &self,
        ctx: &ApiContext,
        payload: &ProductPayload,
    ) -> Result<ProductRecord, RemoteError> {
        let url = self.products_url(&[])?;
        let request = self
            .core
            .request(Method::POST, url, ctx)
            .header("Prefer", "return=representation")
            .json(payload);
        let rows: Vec<ProductRecord> = self.core.send_json(request).await?;
        rows.into_iter().next().ok_or(RemoteError::EmptyResponse)
    }

    /// Overwrite a product and return the stored row.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::EmptyResponse` if no row matched `id`.
    #[instrument(skip(self, ctx, payload))]
    pub async fn update_product(
        &self,
        ctx: &ApiContext,
        id: ProductId,
        payload: &ProductPayload,
    ) -> Result<ProductRecord, RemoteError> {
        let url = self.products_url(&[("id", format!("eq.{id}"))])?;
        let request = self
            .core
            .request(Method::PATCH, url, ctx)
            .header("Prefer", "return=representation")
            .json(payload);
        let rows: Vec<ProductRecord> = self.core.send_json(request).await?;
        rows.into_iter().next().ok_or(RemoteError::EmptyResponse)
    }

    /// Delete a product. Deleting a missing row is not an error.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` on transport failure or non-success status.
    #[instrument(skip(self, ctx))]
    pub async fn delete_product(&self, ctx: &ApiContext, id: ProductId) -> Result<(), RemoteError> {
        let url = self.products_url(&[("id", format!("eq.{id}"))])?;
        self.core
            .send(self.core.request(Method::DELETE, url, ctx))
            .await?;
        Ok(())
    }
}
