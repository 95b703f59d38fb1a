//! # Customer Repository
//!
//! Database operations for registered customers.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use fiado_core::Customer;

const CUSTOMER_COLUMNS: &str = r#"
    id, name, document, phone, credit_limit_cents, is_active,
    created_at, updated_at
"#;

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Inserts a new customer.
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, document, phone, credit_limit_cents, is_active,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.document)
        .bind(&customer.phone)
        .bind(customer.credit_limit_cents)
        .bind(customer.is_active)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Gets a customer by CPF/CNPJ document.
    pub async fn get_by_document(&self, document: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE document = ?"
        ))
        .bind(document)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Searches active customers by name or document.
    pub async fn search(&self, query: &str, limit: i64) -> DbResult<Vec<Customer>> {
        let pattern = format!("%{}%", query);

        let customers = sqlx::query_as::<_, Customer>(&format!(
            r#"
            SELECT {CUSTOMER_COLUMNS}
            FROM customers
            WHERE is_active = 1
              AND (name LIKE ? COLLATE NOCASE OR document LIKE ?)
            ORDER BY name
            LIMIT ?
            "#
        ))
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Lists active customers, paginated.
    pub async fn list_active(&self, limit: i64, offset: i64) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            r#"
            SELECT {CUSTOMER_COLUMNS}
            FROM customers
            WHERE is_active = 1
            ORDER BY name
            LIMIT ? OFFSET ?
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Updates a customer's mutable fields.
    pub async fn update(&self, customer: &Customer) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE customers SET
                name = ?, document = ?, phone = ?,
                credit_limit_cents = ?, is_active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&customer.name)
        .bind(&customer.document)
        .bind(&customer.phone)
        .bind(customer.credit_limit_cents)
        .bind(customer.is_active)
        .bind(customer.updated_at)
        .bind(&customer.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", &customer.id));
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

    fn customer(id: &str, name: &str, document: Option<&str>) -> Customer {
        let now = Utc::now();
        Customer {
            id: id.to_string(),
            name: name.to_string(),
            document: document.map(str::to_string),
            phone: None,
            credit_limit_cents: 50000,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.customers();

        repo.insert(&customer("c1", "João Silva", Some("12345678901")))
            .await
            .unwrap();

        let found = repo.get_by_id("c1").await.unwrap().unwrap();
        assert_eq!(found.name, "João Silva");
        assert_eq!(found.credit_limit_cents, 50000);

        let by_doc = repo.get_by_document("12345678901").await.unwrap().unwrap();
        assert_eq!(by_doc.id, "c1");
    }

    #[tokio::test]
    async fn test_duplicate_document_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.customers();

        repo.insert(&customer("c1", "João", Some("12345678901")))
            .await
            .unwrap();
        let err = repo
            .insert(&customer("c2", "Maria", Some("12345678901")))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { .. }));

        // Multiple customers without a document are fine (partial index).
        repo.insert(&customer("c3", "Pedro", None)).await.unwrap();
        repo.insert(&customer("c4", "Ana", None)).await.unwrap();
    }

    #[tokio::test]
    async fn test_search_by_name() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.customers();

        repo.insert(&customer("c1", "João Silva", None))
            .await
            .unwrap();
        repo.insert(&customer("c2", "Maria Souza", None))
            .await
            .unwrap();

        let results = repo.search("silva", 20).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "c1");
    }
}
