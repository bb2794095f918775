//! Product cache repository.

use sqlx::{SqliteExecutor, SqlitePool};

use keylab_core::ProductId;

use super::{RepositoryError, parse_price};
use crate::models::Product;

const SELECT_PRODUCT: &str = r"
    SELECT id, name, price, category, subcategory, description, stock,
           image_url, created_at, updated_at
    FROM products
";

const UPSERT_PRODUCT: &str = r"
    INSERT INTO products (id, name, price, category, subcategory, description,
                          stock, image_url, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    ON CONFLICT (id) DO UPDATE SET
        name = excluded.name,
        price = excluded.price,
        category = excluded.category,
        subcategory = excluded.subcategory,
        description = excluded.description,
        stock = excluded.stock,
        image_url = excluded.image_url,
        created_at = excluded.created_at,
        updated_at = excluded.updated_at
";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    price: String,
    category: String,
    subcategory: Option<String>,
    description: Option<String>,
    stock: i64,
    image_url: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let stock = i32::try_from(row.stock).map_err(|_| {
            RepositoryError::DataCorruption(format!("stock out of range: {}", row.stock))
        })?;

        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            price: parse_price(&row.price)?,
            category: row.category,
            subcategory: row.subcategory,
            description: row.description,
            stock,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_products(rows: Vec<ProductRow>) -> Result<Vec<Product>, RepositoryError> {
    rows.into_iter().map(Product::try_from).collect()
}

/// Escape `LIKE` wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

async fn upsert_with<'e, E>(executor: E, product: &Product) -> Result<(), RepositoryError>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(UPSERT_PRODUCT)
        .bind(product.id.as_i64())
        .bind(&product.name)
        .bind(product.price.to_string())
        .bind(&product.category)
        .bind(&product.subcategory)
        .bind(&product.description)
        .bind(product.stock)
        .bind(&product.image_url)
        .bind(&product.created_at)
        .bind(&product.updated_at)
        .execute(executor)
        .await?;
    Ok(())
}

/// Repository for the local product mirror.
pub struct ProductRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// All cached products, newest ID first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored price is invalid.
    pub async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!("{SELECT_PRODUCT} ORDER BY id DESC"))
            .fetch_all(self.pool)
            .await?;
        into_products(rows)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!("{SELECT_PRODUCT} WHERE id = ?1"))
            .bind(id.as_i64())
            .fetch_optional(self.pool)
            .await?;
        row.map(Product::try_from).transpose()
    }

    /// Products whose name contains `query`, ignoring case, sorted by name.
    ///
    /// SQLite's `LIKE` only folds ASCII letters, so queries with other
    /// characters (`ñ`, accented vowels) are matched in Rust instead.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search_by_name(&self, query: &str) -> Result<Vec<Product>, RepositoryError> {
        if !query.is_ascii() {
            let needle = query.to_lowercase();
            let mut products = self.list_all().await?;
            products.retain(|p| p.name.to_lowercase().contains(&needle));
            products.sort_by(|a, b| a.name.cmp(&b.name));
            return Ok(products);
        }

        let pattern = format!("%{}%", escape_like(query));
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "{SELECT_PRODUCT} WHERE name LIKE ?1 ESCAPE '\\' ORDER BY name ASC"
        ))
        .bind(pattern)
        .fetch_all(self.pool)
        .await?;
        into_products(rows)
    }

    /// Products in `category`, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_category(&self, category: &str) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "{SELECT_PRODUCT} WHERE category = ?1 ORDER BY name ASC"
        ))
        .bind(category)
        .fetch_all(self.pool)
        .await?;
        into_products(rows)
    }

    /// Products with stock, largest stock first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_in_stock(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "{SELECT_PRODUCT} WHERE stock > 0 ORDER BY stock DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        into_products(rows)
    }

    /// Distinct categories, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<String>, RepositoryError> {
        let categories =
            sqlx::query_scalar("SELECT DISTINCT category FROM products ORDER BY category ASC")
                .fetch_all(self.pool)
                .await?;
        Ok(categories)
    }

    /// Insert or replace a single product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the write fails.
    pub async fn upsert(&self, product: &Product) -> Result<(), RepositoryError> {
        upsert_with(self.pool, product).await
    }

    /// Insert or replace several products in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any write fails; nothing is
    /// written in that case.
    pub async fn upsert_many(&self, products: &[Product]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for product in products {
            upsert_with(&mut *tx, product).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Replace the whole table with `products`.
    ///
    /// Runs in a single transaction, so a failure leaves the previous
    /// contents in place.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn replace_all(&self, products: &[Product]) -> Result<usize, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM products")
            .execute(&mut *tx)
            .await?;
        for product in products {
            upsert_with(&mut *tx, product).await?;
        }
        tx.commit().await?;
        Ok(products.len())
    }

    /// Overwrite an existing product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this ID.
    /// Returns `RepositoryError::Database` if the write fails.
    pub async fn update(&self, product: &Product) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE products
            SET name = ?2, price = ?3, category = ?4, subcategory = ?5,
                description = ?6, stock = ?7, image_url = ?8,
                created_at = ?9, updated_at = ?10
            WHERE id = ?1
            ",
        )
        .bind(product.id.as_i64())
        .bind(&product.name)
        .bind(product.price.to_string())
        .bind(&product.category)
        .bind(&product.subcategory)
        .bind(&product.description)
        .bind(product.stock)
        .bind(&product.image_url)
        .bind(&product.created_at)
        .bind(&product.updated_at)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete a product. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_by_id(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id.as_i64())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every cached product. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_all(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM products")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Number of cached products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Number of cached products in `category`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_by_category(&self, category: &str) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category = ?1")
            .bind(category)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use keylab_core::Price;

    use super::*;
    use crate::db::test_pool;

    fn product(id: i64, name: &str, category: &str, stock: i32) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            price: Price::from_whole(10_000 * id),
            category: category.to_string(),
            subcategory: None,
            description: None,
            stock,
            image_url: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn catalog() -> Vec<Product> {
        vec![
            product(1, "Teclado Keychron K2", "Teclados", 5),
            product(2, "Switch Gateron Red", "Switches", 120),
            product(3, "Keycaps PBT Azul", "Keycaps", 0),
            product(4, "Teclado Akko 3068", "Teclados", 2),
        ]
    }

    #[tokio::test]
    async fn test_list_all_newest_first() {
        let pool = test_pool().await;
        let repo = ProductRepository::new(&pool);
        repo.replace_all(&catalog()).await.unwrap();

        let ids: Vec<i64> = repo
            .list_all()
            .await
            .unwrap()
            .iter()
            .map(|p| p.id.as_i64())
            .collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);
    }

    #[tokio::test]
    async fn test_price_survives_storage() {
        let pool = test_pool().await;
        let repo = ProductRepository::new(&pool);
        let mut p = product(7, "Cable", "Accesorios", 1);
        p.price = "12990.50".parse().unwrap();
        repo.upsert(&p).await.unwrap();

        let stored = repo.get_by_id(p.id).await.unwrap().unwrap();
        assert_eq!(stored, p);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_sorted() {
        let pool = test_pool().await;
        let repo = ProductRepository::new(&pool);
        repo.replace_all(&catalog()).await.unwrap();

        let names: Vec<String> = repo
            .search_by_name("teclado")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Teclado Akko 3068", "Teclado Keychron K2"]);
    }

    #[tokio::test]
    async fn test_search_folds_non_ascii_case() {
        let pool = test_pool().await;
        let repo = ProductRepository::new(&pool);
        repo.replace_all(&[
            product(1, "Teclado Ñandú", "Teclados", 1),
            product(2, "Mouse Inalámbrico", "Mouse", 1),
            product(3, "Teclado Akko", "Teclados", 1),
        ])
        .await
        .unwrap();

        let hits = repo.search_by_name("ñandú").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, ProductId::new(1));

        let hits = repo.search_by_name("INALÁMBRICO").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, ProductId::new(2));
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        let pool = test_pool().await;
        let repo = ProductRepository::new(&pool);
        repo.replace_all(&catalog()).await.unwrap();

        assert!(repo.search_by_name("%").await.unwrap().is_empty());
        assert!(repo.search_by_name("_").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_in_stock_sorted_by_stock() {
        let pool = test_pool().await;
        let repo = ProductRepository::new(&pool);
        repo.replace_all(&catalog()).await.unwrap();

        let stocks: Vec<i32> = repo
            .list_in_stock()
            .await
            .unwrap()
            .iter()
            .map(|p| p.stock)
            .collect();
        assert_eq!(stocks, vec![120, 5, 2]);
    }

    #[tokio::test]
    async fn test_categories_and_counts() {
        let pool = test_pool().await;
        let repo = ProductRepository::new(&pool);
        repo.replace_all(&catalog()).await.unwrap();

        assert_eq!(
            repo.list_categories().await.unwrap(),
            vec!["Keycaps", "Switches", "Teclados"]
        );
        assert_eq!(repo.count().await.unwrap(), 4);
        assert_eq!(repo.count_by_category("Teclados").await.unwrap(), 2);
        assert_eq!(repo.list_by_category("Teclados").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_replace_all_drops_missing_rows() {
        let pool = test_pool().await;
        let repo = ProductRepository::new(&pool);
        repo.replace_all(&catalog()).await.unwrap();

        let written = repo
            .replace_all(&[product(9, "Nuevo", "Teclados", 1)])
            .await
            .unwrap();
        assert_eq!(written, 1);
        assert_eq!(repo.count().await.unwrap(), 1);
        assert!(repo.get_by_id(ProductId::new(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let pool = test_pool().await;
        let repo = ProductRepository::new(&pool);
        repo.upsert_many(&catalog()).await.unwrap();

        let mut p = repo.get_by_id(ProductId::new(2)).await.unwrap().unwrap();
        p.stock = 99;
        repo.update(&p).await.unwrap();
        assert_eq!(
            repo.get_by_id(p.id).await.unwrap().unwrap().stock,
            99
        );

        let missing = product(42, "Fantasma", "Nada", 0);
        assert!(matches!(
            repo.update(&missing).await,
            Err(RepositoryError::NotFound)
        ));

        assert!(repo.delete_by_id(p.id).await.unwrap());
        assert!(!repo.delete_by_id(p.id).await.unwrap());
        assert_eq!(repo.delete_all().await.unwrap(), 3);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
