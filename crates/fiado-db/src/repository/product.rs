//! # Product Repository
//!
//! Database operations for the product catalog.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use fiado_core::Product;

const PRODUCT_COLUMNS: &str = r#"
    id, sku, barcode, name, description,
    price_cents, cost_cents, current_stock, is_active,
    created_at, updated_at
"#;

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, barcode, name, description,
                price_cents, cost_cents, current_stock, is_active,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.current_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?"
        ))
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by barcode.
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE barcode = ? AND is_active = 1"
        ))
        .bind(barcode)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Searches active products by name, SKU, or barcode.
    ///
    /// Matching is case-insensitive substring on name/SKU and exact on
    /// barcode (scanners send the full code).
    pub async fn search(&self, query: &str, limit: i64) -> DbResult<Vec<Product>> {
        let pattern = format!("%{}%", query);

        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE is_active = 1
              AND (name LIKE ? COLLATE NOCASE
                   OR sku LIKE ? COLLATE NOCASE
                   OR barcode = ?)
            ORDER BY name
            LIMIT ?
            "#
        ))
        .bind(&pattern)
        .bind(&pattern)
        .bind(query)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Lists active products, paginated.
    pub async fn list_active(&self, limit: i64, offset: i64) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE is_active = 1
            ORDER BY name
            LIMIT ? OFFSET ?
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Updates a product's mutable fields.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products SET
                sku = ?, barcode = ?, name = ?, description = ?,
                price_cents = ?, cost_cents = ?, current_stock = ?,
                is_active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&product.sku)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.current_stock)
        .bind(product.is_active)
        .bind(product.updated_at)
        .bind(&product.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Soft-deletes a product (sets is_active = false).
    ///
    /// Products are never hard-deleted: sale items reference them.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE products SET is_active = 0, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;

    fn product(id: &str, sku: &str, name: &str, price: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            sku: sku.to_string(),
            barcode: None,
            name: name.to_string(),
            description: None,
            price_cents: price,
            cost_cents: None,
            current_stock: Some(10),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert(&product("p1", "CAFE-500", "Café Torrado 500g", 2390))
            .await
            .unwrap();

        let found = repo.get_by_id("p1").await.unwrap().unwrap();
        assert_eq!(found.sku, "CAFE-500");
        assert_eq!(found.price_cents, 2390);

        let by_sku = repo.get_by_sku("CAFE-500").await.unwrap().unwrap();
        assert_eq!(by_sku.id, "p1");

        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert(&product("p1", "CAFE-500", "Café", 2390))
            .await
            .unwrap();
        let err = repo
            .insert(&product("p2", "CAFE-500", "Outro Café", 2590))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_search_matches_name_and_sku() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert(&product("p1", "CAFE-500", "Café Torrado", 2390))
            .await
            .unwrap();
        repo.insert(&product("p2", "ACUCAR-1K", "Açúcar Cristal", 550))
            .await
            .unwrap();

        let results = repo.search("cafe", 20).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "p1");

        let results = repo.search("ACUCAR", 20).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "p2");
    }

    #[tokio::test]
    async fn test_deactivate_hides_from_search() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert(&product("p1", "CAFE-500", "Café Torrado", 2390))
            .await
            .unwrap();
        repo.deactivate("p1").await.unwrap();

        assert!(repo.search("Café", 20).await.unwrap().is_empty());
        // Still retrievable by id for historical sales.
        assert!(repo.get_by_id("p1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let mut p = product("p1", "CAFE-500", "Café Torrado", 2390);
        repo.insert(&p).await.unwrap();

        p.price_cents = 2590;
        p.updated_at = Utc::now();
        repo.update(&p).await.unwrap();

        let found = repo.get_by_id("p1").await.unwrap().unwrap();
        assert_eq!(found.price_cents, 2590);

        let missing = product("ghost", "GHOST", "Ghost", 1);
        assert!(matches!(
            repo.update(&missing).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }
}
