//! # Sale Repository
//!
//! Database operations for sales, their line items, and payments.
//!
//! ## Finalization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   finalize(sale, items, payments, receivables)          │
//! │                                                                         │
//! │  BEGIN TRANSACTION                                                      │
//! │    INSERT sale              (status = completed)                        │
//! │    INSERT sale_items        (price/name snapshots frozen)               │
//! │    INSERT payments          (split tender supported)                    │
//! │    INSERT receivables       (crediário installments, may be empty)      │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  A crediário sale either produces the sale AND its installments, or     │
//! │  nothing. No sale without its debt, no debt without its sale.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use fiado_core::{Payment, Receivable, Sale, SaleItem};

const SALE_COLUMNS: &str = r#"
    id, receipt_number, status, customer_id,
    subtotal_cents, discount_cents, total_cents,
    user_id, notes, created_at, updated_at, completed_at
"#;

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Generates the next receipt number (`VND-000001`, `VND-000002`, ...).
    ///
    /// Sequential per database. The UNIQUE constraint on receipt_number is
    /// the real guard; on a collision the caller's insert fails and the
    /// checkout is retried.
    pub async fn next_receipt_number(&self) -> DbResult<String> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(format!("VND-{:06}", count + 1))
    }

    /// Persists a completed sale with its items, payments, and crediário
    /// installments in a single transaction.
    ///
    /// `receivables` is empty for fully cash/card/pix sales.
    pub async fn finalize(
        &self,
        sale: &Sale,
        items: &[SaleItem],
        payments: &[Payment],
        receivables: &[Receivable],
    ) -> DbResult<()> {
        debug!(
            id = %sale.id,
            receipt = %sale.receipt_number,
            items = items.len(),
            payments = payments.len(),
            installments = receivables.len(),
            "Finalizing sale"
        );

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
            receipt = %sale.receipt_number,
            total_cents = sale.total_cents,
            "Sale finalized"
        );

        Ok(())
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale =
            sqlx::query_as::<_, Sale>(&format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(sale)
    }

    /// Gets a sale by receipt number.
    pub async fn get_by_receipt(&self, receipt_number: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE receipt_number = ?"
        ))
        .bind(receipt_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets the line items for a sale, in insertion order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, product_id, sku_snapshot, name_snapshot,
                   unit_price_cents, quantity, discount_cents,
                   line_total_cents, created_at
            FROM sale_items
            WHERE sale_id = ?
            ORDER BY rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets the payments recorded for a sale.
    pub async fn get_payments(&self, sale_id: &str) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, sale_id, method, amount_cents, reference, created_at
            FROM payments
            WHERE sale_id = ?
            ORDER BY rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Lists the most recent sales.
    pub async fn list_recent(&self, limit: i64, offset: i64) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            r#"
            SELECT {SALE_COLUMNS}
            FROM sales
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Voids a completed sale.
    ///
    /// Only `completed` sales can be voided; voiding is refused when the
    /// sale still has pending receivables (settle or correct those first).
    pub async fn void(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let pending: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM receivables WHERE sale_id = ? AND status = 'pending'",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if pending > 0 {
            return Err(DbError::conflict("Sale", id));
        }

        let result = sqlx::query(
            r#"
            UPDATE sales SET status = 'voided', updated_at = datetime('now')
            WHERE id = ? AND status = 'completed'
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        tx.commit().await?;
        info!(sale_id = %id, "Sale voided");
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
    use fiado_core::{PaymentMethod, ReceivableStatus, SaleStatus};

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

    fn sale(id: &str, receipt: &str, customer: Option<&str>, total: i64) -> Sale {
        let now = Utc::now();
        Sale {
            id: id.to_string(),
            receipt_number: receipt.to_string(),
            status: SaleStatus::Completed,
            customer_id: customer.map(str::to_string),
            subtotal_cents: total,
            discount_cents: 0,
            total_cents: total,
            user_id: "op-1".to_string(),
            notes: None,
            created_at: now,
            updated_at: now,
            completed_at: Some(now),
        }
    }

    fn item(sale_id: &str, qty: i64, unit: i64) -> SaleItem {
        SaleItem {
            id: uuid::Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            product_id: "p1".to_string(),
            sku_snapshot: "CAFE-500".to_string(),
            name_snapshot: "Café".to_string(),
            unit_price_cents: unit,
            quantity: qty,
            discount_cents: 0,
            line_total_cents: unit * qty,
            created_at: Utc::now(),
        }
    }

    fn payment(sale_id: &str, method: PaymentMethod, amount: i64) -> Payment {
        Payment {
            id: uuid::Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            method,
            amount_cents: amount,
            reference: None,
            created_at: Utc::now(),
        }
    }

    fn installment(sale_id: &str, due: &str, amount: i64) -> Receivable {
        let now = Utc::now();
        Receivable {
            id: uuid::Uuid::new_v4().to_string(),
            customer_id: "cust-1".to_string(),
            sale_id: Some(sale_id.to_string()),
            amount_cents: amount,
            amount_paid_cents: 0,
            due_date: due.parse().unwrap(),
            status: ReceivableStatus::Pending,
            paid_at: None,
            paid_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_receipt_numbers_are_sequential() {
        let db = test_db().await;
        let repo = db.sales();

        assert_eq!(repo.next_receipt_number().await.unwrap(), "VND-000001");

        let s = sale("s1", "VND-000001", None, 2390);
        repo.finalize(
            &s,
            &[item("s1", 1, 2390)],
            &[payment("s1", PaymentMethod::Cash, 2390)],
            &[],
        )
        .await
        .unwrap();

        assert_eq!(repo.next_receipt_number().await.unwrap(), "VND-000002");
    }

    #[tokio::test]
    async fn test_finalize_cash_sale() {
        let db = test_db().await;
        let repo = db.sales();

        let s = sale("s1", "VND-000001", None, 4780);
        repo.finalize(
            &s,
            &[item("s1", 2, 2390)],
            &[payment("s1", PaymentMethod::Cash, 4780)],
            &[],
        )
        .await
        .unwrap();

        let found = repo.get_by_id("s1").await.unwrap().unwrap();
        assert_eq!(found.status, SaleStatus::Completed);
        assert_eq!(found.total_cents, 4780);

        let items = repo.get_items("s1").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 2);

        let payments = repo.get_payments("s1").await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].method, PaymentMethod::Cash);
    }

    #[tokio::test]
    async fn test_finalize_crediario_creates_installments() {
        let db = test_db().await;
        let repo = db.sales();

        let s = sale("s1", "VND-000001", Some("cust-1"), 7170);
        repo.finalize(
            &s,
            &[item("s1", 3, 2390)],
            &[payment("s1", PaymentMethod::Crediario, 7170)],
            &[
                installment("s1", "2024-02-01", 2390),
                installment("s1", "2024-03-01", 2390),
                installment("s1", "2024-04-01", 2390),
            ],
        )
        .await
        .unwrap();

        let pending = db.receivables().list_pending("cust-1").await.unwrap();
        assert_eq!(pending.len(), 3);
        assert_eq!(
            db.receivables()
                .outstanding_balance("cust-1")
                .await
                .unwrap(),
            7170
        );
    }

    #[tokio::test]
    async fn test_finalize_rolls_back_on_bad_installment() {
        let db = test_db().await;
        let repo = db.sales();

        let s = sale("s1", "VND-000001", Some("cust-1"), 2390);
        let mut bad = installment("s1", "2024-02-01", 2390);
        bad.customer_id = "missing-customer".to_string();

        let err = repo
            .finalize(
                &s,
                &[item("s1", 1, 2390)],
                &[payment("s1", PaymentMethod::Crediario, 2390)],
                &[bad],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));

        // The sale itself must not exist: the transaction rolled back.
        assert!(repo.get_by_id("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_void_refused_with_pending_receivables() {
        let db = test_db().await;
        let repo = db.sales();

        let s = sale("s1", "VND-000001", Some("cust-1"), 2390);
        repo.finalize(
            &s,
            &[item("s1", 1, 2390)],
            &[payment("s1", PaymentMethod::Crediario, 2390)],
            &[installment("s1", "2024-02-01", 2390)],
        )
        .await
        .unwrap();

        let err = repo.void("s1").await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        let found = repo.get_by_id("s1").await.unwrap().unwrap();
        assert_eq!(found.status, SaleStatus::Completed);
    }

    #[tokio::test]
    async fn test_void_cash_sale() {
        let db = test_db().await;
        let repo = db.sales();

        let s = sale("s1", "VND-000001", None, 2390);
        repo.finalize(
            &s,
            &[item("s1", 1, 2390)],
            &[payment("s1", PaymentMethod::Cash, 2390)],
            &[],
        )
        .await
        .unwrap();

        repo.void("s1").await.unwrap();
        let found = repo.get_by_id("s1").await.unwrap().unwrap();
        assert_eq!(found.status, SaleStatus::Voided);

        // Voiding twice is refused.
        assert!(repo.void("s1").await.is_err());
    }
}
