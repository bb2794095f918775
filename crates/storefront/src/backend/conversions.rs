//! Conversions between backend records and domain models.

use keylab_core::ProductId;

use super::StorageClient;
use super::types::{ProductPayload, ProductRecord};
use crate::models::{Product, ProductDraft};

/// Convert a catalog row, resolving its image path against `storage`.
#[must_use]
pub fn convert_product(record: ProductRecord, storage: &StorageClient) -> Product {
    let image_url = storage.resolve_image_url(record.image_url.as_deref());
    Product {
        id: ProductId::new(record.id),
        name: record.name,
        price: record.price,
        category: record.category,
        subcategory: record.subcategory,
        description: record.description,
        stock: record.stock,
        image_url,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

/// Convert a list of catalog rows.
#[must_use]
pub fn convert_products(records: Vec<ProductRecord>, storage: &StorageClient) -> Vec<Product> {
    records
        .into_iter()
        .map(|record| convert_product(record, storage))
        .collect()
}

impl From<&ProductDraft> for ProductPayload {
    fn from(draft: &ProductDraft) -> Self {
        Self {
            name: draft.name.clone(),
            price: draft.price,
            category: draft.category.clone(),
            subcategory: draft.subcategory.clone(),
            description: draft.description.clone(),
            stock: draft.stock,
            image_url: draft.image_url.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use keylab_core::Price;
    use secrecy::SecretString;

    use super::*;
    use crate::backend::Backend;
    use crate::config::BackendConfig;

    fn record(image: Option<&str>) -> ProductRecord {
        ProductRecord {
            id: 3,
            name: "Keycaps PBT".to_string(),
            price: Price::from_whole(29_990),
            category: "Keycaps".to_string(),
            subcategory: Some("PBT".to_string()),
            description: None,
            stock: 8,
            image_url: image.map(str::to_string),
            created_at: Some("2024-05-01T12:00:00+00:00".to_string()),
            updated_at: None,
        }
    }

    #[test]
    fn test_convert_product_resolves_image() {
        let config =
            BackendConfig::new("http://127.0.0.1:54321", SecretString::from("anon")).unwrap();
        let storage = Backend::new(&config).unwrap().storage;

        let product = convert_product(record(Some("keycaps/pbt.png")), &storage);
        assert_eq!(product.id, ProductId::new(3));
        assert_eq!(
            product.image_url.as_deref(),
            Some("http://127.0.0.1:54321/storage/v1/object/public/productos/keycaps/pbt.png")
        );

        let product = convert_product(record(Some("")), &storage);
        assert_eq!(product.image_url, None);
    }
}
