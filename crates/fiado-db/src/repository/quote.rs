//! # Quote Repository
//!
//! Database operations for quotes (orçamentos) and their conversion into
//! sales.
//!
//! ## Conversion
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │           convert(quote_id, sale, items, payments, receivables)         │
//! │                                                                         │
//! │  BEGIN TRANSACTION                                                      │
//! │    UPDATE quotes SET status = 'converted', converted_sale_id = ?        │
//! │     WHERE id = ? AND status = 'open'    ◄── double-convert guard        │
//! │    0 rows? → ROLLBACK, return Conflict                                  │
//! │    INSERT sale + sale_items + payments + receivables                    │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Two cashiers converting the same quote race on the guard: exactly one  │
//! │  sale is created.                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use fiado_core::{Payment, Quote, QuoteItem, Receivable, Sale, SaleItem};

const QUOTE_COLUMNS: &str = r#"
    id, quote_number, status, customer_id,
    subtotal_cents, discount_cents, total_cents,
    valid_until, created_by, notes, converted_sale_id,
    created_at, updated_at
"#;

/// Repository for quote database operations.
#[derive(Debug, Clone)]
pub struct QuoteRepository {
    pool: SqlitePool,
}

impl QuoteRepository {
    /// Creates a new QuoteRepository.
    pub fn new(pool: SqlitePool) -> Self {
        QuoteRepository { pool }
    }

    /// Generates the next quote number (`ORC-000001`, ...).
    ///
    /// Same scheme as receipt numbers; the UNIQUE constraint is the guard.
    pub async fn next_quote_number(&self) -> DbResult<String> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quotes")
            .fetch_one(&self.pool)
            .await?;

        Ok(format!("ORC-{:06}", count + 1))
    }

    /// Persists a quote with its items in a single transaction.
    pub async fn create(&self, quote: &Quote, items: &[QuoteItem]) -> DbResult<()> {
        debug!(
            id = %quote.id,
            number = %quote.quote_number,
            items = items.len(),
            "Creating quote"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO quotes (
                id, quote_number, status, customer_id,
                subtotal_cents, discount_cents, total_cents,
                valid_until, created_by, notes, converted_sale_id,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&quote.id)
        .bind(&quote.quote_number)
        .bind(quote.status)
        .bind(&quote.customer_id)
        .bind(quote.subtotal_cents)
        .bind(quote.discount_cents)
        .bind(quote.total_cents)
        .bind(quote.valid_until)
        .bind(&quote.created_by)
        .bind(&quote.notes)
        .bind(&quote.converted_sale_id)
        .bind(quote.created_at)
        .bind(quote.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO quote_items (
                    id, quote_id, product_id, sku_snapshot, name_snapshot,
                    unit_price_cents, quantity, discount_cents,
                    line_total_cents, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&item.id)
            .bind(&item.quote_id)
            .bind(&item.product_id)
            .bind(&item.sku_snapshot)
            .bind(&item.name_snapshot)
            .bind(item.unit_price_cents)
            .bind(item.quantity)
            .bind(item.discount_cents)
            .bind(item.line_total_cents)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Gets a quote by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Quote>> {
        let quote =
            sqlx::query_as::<_, Quote>(&format!("SELECT {QUOTE_COLUMNS} FROM quotes WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(quote)
    }

    /// Gets a quote by business number.
    pub async fn get_by_number(&self, quote_number: &str) -> DbResult<Option<Quote>> {
        let quote = sqlx::query_as::<_, Quote>(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quotes WHERE quote_number = ?"
        ))
        .bind(quote_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quote)
    }

    /// Gets the line items for a quote, in insertion order.
    pub async fn get_items(&self, quote_id: &str) -> DbResult<Vec<QuoteItem>> {
        let items = sqlx::query_as::<_, QuoteItem>(
            r#"
            SELECT id, quote_id, product_id, sku_snapshot, name_snapshot,
                   unit_price_cents, quantity, discount_cents,
                   line_total_cents, created_at
            FROM quote_items
            WHERE quote_id = ?
            ORDER BY rowid
            "#,
        )
        .bind(quote_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists quotes, most recent first.
    pub async fn list(&self, limit: i64, offset: i64) -> DbResult<Vec<Quote>> {
        let quotes = sqlx::query_as::<_, Quote>(&format!(
            r#"
            SELECT {QUOTE_COLUMNS}
            FROM quotes
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(quotes)
    }

    /// Marks open quotes past their validity date as expired.
    /// Returns the number of quotes expired.
    pub async fn expire_stale(&self, today: NaiveDate) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE quotes SET status = 'expired', updated_at = datetime('now')
            WHERE status = 'open' AND valid_until IS NOT NULL AND valid_until < ?
            "#,
        )
        .bind(today)
        .execute(&self.pool)
        .await?;

        let expired = result.rows_affected();
        if expired > 0 {
            info!(count = expired, "Expired stale quotes");
        }
        Ok(expired)
    }

    /// Converts a quote into a finalized sale in a single transaction.
    ///
    /// The quote is flipped to `converted` with a guard on `status = 'open'`;
    /// if another conversion (or expiry) won the race, the transaction rolls
    /// back with [`DbError::Conflict`] and no sale is created.
    pub async fn convert(
        &self,
        quote_id: &str,
        sale: &Sale,
        items: &[SaleItem],
        payments: &[Payment],
        receivables: &[Receivable],
    ) -> DbResult<()> {
        debug!(quote_id = %quote_id, sale_id = %sale.id, "Converting quote to sale");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, receipt_number, status, customer_id,
                subtotal_cents, discount_cents, total_cents,
                user_id, notes, created_at, updated_at, completed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.receipt_number)
        .bind(sale.status)
        .bind(&sale.customer_id)
        .bind(sale.subtotal_cents)
        .bind(sale.discount_cents)
        .bind(sale.total_cents)
        .bind(&sale.user_id)
        .bind(&sale.notes)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .bind(sale.completed_at)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            r#"
            UPDATE quotes SET
                status = 'converted',
                converted_sale_id = ?,
                updated_at = ?
            WHERE id = ? AND status = 'open'
            "#,
        )
        .bind(&sale.id)
        .bind(sale.updated_at)
        .bind(quote_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Already converted or expired; roll everything back.
            return Err(DbError::conflict("Quote", quote_id));
        }

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, product_id, sku_snapshot, name_snapshot,
                    unit_price_cents, quantity, discount_cents,
                    line_total_cents, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&item.id)
            .bind(&item.sale_id)
            .bind(&item.product_id)
            .bind(&item.sku_snapshot)
            .bind(&item.name_snapshot)
            .bind(item.unit_price_cents)
            .bind(item.quantity)
            .bind(item.discount_cents)
            .bind(item.line_total_cents)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;
        }

        for payment in payments {
            sqlx::query(
                r#"
                INSERT INTO payments (
                    id, sale_id, method, amount_cents, reference, created_at
                ) VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&payment.id)
            .bind(&payment.sale_id)
            .bind(payment.method)
            .bind(payment.amount_cents)
            .bind(&payment.reference)
            .bind(payment.created_at)
            .execute(&mut *tx)
            .await?;
        }

        for receivable in receivables {
            sqlx::query(
                r#"
                INSERT INTO receivables (
                    id, customer_id, sale_id,
                    amount_cents, amount_paid_cents, due_date, status,
                    paid_at, paid_by, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&receivable.id)
            .bind(&receivable.customer_id)
            .bind(&receivable.sale_id)
            .bind(receivable.amount_cents)
            .bind(receivable.amount_paid_cents)
            .bind(receivable.due_date)
            .bind(receivable.status)
            .bind(receivable.paid_at)
            .bind(&receivable.paid_by)
            .bind(receivable.created_at)
            .bind(receivable.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            quote_id = %quote_id,
            sale_id = %sale.id,
            receipt = %sale.receipt_number,
            "Quote converted to sale"
        );

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
    use fiado_core::{PaymentMethod, QuoteStatus, SaleStatus};

    async fn test_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO users (id, username, display_name, password_hash, role, is_active, created_at, updated_at)
             VALUES ('op-1', 'maria', 'Maria', 'x', 'cashier', 1, ?, ?)",
        )
        .bind(now)
        .bind(now)
        .execute(db.pool())
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO customers (id, name, credit_limit_cents, is_active, created_at, updated_at)
             VALUES ('cust-1', 'João', 100000, 1, ?, ?)",
        )
        .bind(now)
        .bind(now)
        .execute(db.pool())
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO products (id, sku, name, price_cents, is_active, created_at, updated_at)
             VALUES ('p1', 'CAFE-500', 'Café', 2390, 1, ?, ?)",
        )
        .bind(now)
        .bind(now)
        .execute(db.pool())
        .await
        .unwrap();

        db
    }

    fn quote(id: &str, number: &str, valid_until: Option<&str>) -> Quote {
        let now = Utc::now();
        Quote {
            id: id.to_string(),
            quote_number: number.to_string(),
            status: QuoteStatus::Open,
            customer_id: Some("cust-1".to_string()),
            subtotal_cents: 2390,
            discount_cents: 0,
            total_cents: 2390,
            valid_until: valid_until.map(|d| d.parse().unwrap()),
            created_by: "op-1".to_string(),
            notes: None,
            converted_sale_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn quote_item(quote_id: &str) -> QuoteItem {
        QuoteItem {
            id: uuid::Uuid::new_v4().to_string(),
            quote_id: quote_id.to_string(),
            product_id: "p1".to_string(),
            sku_snapshot: "CAFE-500".to_string(),
            name_snapshot: "Café".to_string(),
            unit_price_cents: 2390,
            quantity: 1,
            discount_cents: 0,
            line_total_cents: 2390,
            created_at: Utc::now(),
        }
    }

    fn sale_from_quote(sale_id: &str) -> (Sale, Vec<SaleItem>, Vec<Payment>) {
        let now = Utc::now();
        let sale = Sale {
            id: sale_id.to_string(),
            receipt_number: "VND-000001".to_string(),
            status: SaleStatus::Completed,
            customer_id: Some("cust-1".to_string()),
            subtotal_cents: 2390,
            discount_cents: 0,
            total_cents: 2390,
            user_id: "op-1".to_string(),
            notes: None,
            created_at: now,
            updated_at: now,
            completed_at: Some(now),
        };
        let items = vec![SaleItem {
            id: uuid::Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            product_id: "p1".to_string(),
            sku_snapshot: "CAFE-500".to_string(),
            name_snapshot: "Café".to_string(),
            unit_price_cents: 2390,
            quantity: 1,
            discount_cents: 0,
            line_total_cents: 2390,
            created_at: now,
        }];
        let payments = vec![Payment {
            id: uuid::Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            method: PaymentMethod::Cash,
            amount_cents: 2390,
            reference: None,
            created_at: now,
        }];
        (sale, items, payments)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = test_db().await;
        let repo = db.quotes();

        let q = quote("q1", "ORC-000001", Some("2099-12-31"));
        repo.create(&q, &[quote_item("q1")]).await.unwrap();

        let found = repo.get_by_id("q1").await.unwrap().unwrap();
        assert_eq!(found.status, QuoteStatus::Open);
        assert_eq!(found.total_cents, 2390);

        let items = repo.get_items("q1").await.unwrap();
        assert_eq!(items.len(), 1);

        let by_number = repo.get_by_number("ORC-000001").await.unwrap().unwrap();
        assert_eq!(by_number.id, "q1");
    }

    #[tokio::test]
    async fn test_quote_numbers_are_sequential() {
        let db = test_db().await;
        let repo = db.quotes();

        assert_eq!(repo.next_quote_number().await.unwrap(), "ORC-000001");
        repo.create(&quote("q1", "ORC-000001", None), &[])
            .await
            .unwrap();
        assert_eq!(repo.next_quote_number().await.unwrap(), "ORC-000002");
    }

    #[tokio::test]
    async fn test_convert_marks_quote_and_creates_sale() {
        let db = test_db().await;
        let repo = db.quotes();

        let q = quote("q1", "ORC-000001", None);
        repo.create(&q, &[quote_item("q1")]).await.unwrap();

        let (sale, items, payments) = sale_from_quote("s1");
        repo.convert("q1", &sale, &items, &payments, &[])
            .await
            .unwrap();

        let converted = repo.get_by_id("q1").await.unwrap().unwrap();
        assert_eq!(converted.status, QuoteStatus::Converted);
        assert_eq!(converted.converted_sale_id.as_deref(), Some("s1"));

        let sale = db.sales().get_by_id("s1").await.unwrap().unwrap();
        assert_eq!(sale.status, SaleStatus::Completed);
    }

    #[tokio::test]
    async fn test_double_convert_refused() {
        let db = test_db().await;
        let repo = db.quotes();

        repo.create(&quote("q1", "ORC-000001", None), &[quote_item("q1")])
            .await
            .unwrap();

        let (sale, items, payments) = sale_from_quote("s1");
        repo.convert("q1", &sale, &items, &payments, &[])
            .await
            .unwrap();

        let (mut sale2, items2, payments2) = sale_from_quote("s2");
        sale2.receipt_number = "VND-000002".to_string();
        let err = repo
            .convert("q1", &sale2, &items2, &payments2, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        // The second sale was rolled back.
        assert!(db.sales().get_by_id("s2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expire_stale() {
        let db = test_db().await;
        let repo = db.quotes();

        repo.create(&quote("q1", "ORC-000001", Some("2024-01-31")), &[])
            .await
            .unwrap();
        repo.create(&quote("q2", "ORC-000002", None), &[])
            .await
            .unwrap();

        let expired = repo.expire_stale("2024-02-15".parse().unwrap()).await.unwrap();
        assert_eq!(expired, 1);

        assert_eq!(
            repo.get_by_id("q1").await.unwrap().unwrap().status,
            QuoteStatus::Expired
        );
        // No validity date means the quote never expires.
        assert_eq!(
            repo.get_by_id("q2").await.unwrap().unwrap().status,
            QuoteStatus::Open
        );
    }
}
