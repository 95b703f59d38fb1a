//! # Receivable Repository
//!
//! Database operations for crediário receivables and the credit audit trail.
//!
//! ## Allocation Persistence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 apply_allocation(plan)                                  │
//! │                                                                         │
//! │  BEGIN TRANSACTION                                                      │
//! │    for each update in plan:                                            │
//! │      UPDATE receivables                                                 │
//! │         SET amount_paid = new, status = ..., paid_at = ...,            │
//! │       WHERE id = ? AND amount_paid = expected   ◄── optimistic guard   │
//! │      0 rows? → ROLLBACK, return Conflict                               │
//! │    INSERT INTO credit_audit (allocation_id UNIQUE, ...)                │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Either every record update plus the audit entry lands, or none do.    │
//! │  A crash mid-allocation cannot leave a partial payment applied, and    │
//! │  a retried plan is rejected by the unique allocation_id.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use fiado_core::allocator::AllocationPlan;
use fiado_core::{CreditAuditEntry, Receivable};

/// Repository for receivable database operations.
#[derive(Debug, Clone)]
pub struct ReceivableRepository {
    pool: SqlitePool,
}

impl ReceivableRepository {
    /// Creates a new ReceivableRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReceivableRepository { pool }
    }

    /// Inserts a receivable record.
    ///
    /// Normally called inside the sale-finalization transaction; exposed
    /// for administrative corrections and tests.
    pub async fn insert(&self, receivable: &Receivable) -> DbResult<()> {
        debug!(id = %receivable.id, customer_id = %receivable.customer_id, "Inserting receivable");

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
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a receivable by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Receivable>> {
        let receivable = sqlx::query_as::<_, Receivable>(
            r#"
            SELECT id, customer_id, sale_id,
                   amount_cents, amount_paid_cents, due_date, status,
                   paid_at, paid_by, created_at, updated_at
            FROM receivables
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(receivable)
    }

    /// Lists a customer's pending receivables, oldest due date first.
    ///
    /// The ordering matches the allocator's own sort (due date, then id),
    /// so the plan's update order follows the listing order.
    pub async fn list_pending(&self, customer_id: &str) -> DbResult<Vec<Receivable>> {
        let receivables = sqlx::query_as::<_, Receivable>(
            r#"
            SELECT id, customer_id, sale_id,
                   amount_cents, amount_paid_cents, due_date, status,
                   paid_at, paid_by, created_at, updated_at
            FROM receivables
            WHERE customer_id = ? AND status = 'pending'
            ORDER BY due_date, id
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(receivables)
    }

    /// Lists the installments created by a sale, earliest due first.
    pub async fn list_for_sale(&self, sale_id: &str) -> DbResult<Vec<Receivable>> {
        let receivables = sqlx::query_as::<_, Receivable>(
            r#"
            SELECT id, customer_id, sale_id,
                   amount_cents, amount_paid_cents, due_date, status,
                   paid_at, paid_by, created_at, updated_at
            FROM receivables
            WHERE sale_id = ?
            ORDER BY due_date, id
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(receivables)
    }

    /// Sum of outstanding balances across a customer's pending records.
    pub async fn outstanding_balance(&self, customer_id: &str) -> DbResult<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(amount_cents - amount_paid_cents)
            FROM receivables
            WHERE customer_id = ? AND status = 'pending'
            "#,
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(0))
    }

    /// Applies an allocation plan atomically.
    ///
    /// All record updates and the audit entry are committed in ONE
    /// transaction. Each update carries an optimistic guard on the paid
    /// amount observed at plan time; if any row was modified concurrently
    /// the transaction rolls back with [`DbError::Conflict`] and the caller
    /// should recompute the plan from fresh records. A retried plan with an
    /// already-used `allocation_id` fails the audit insert's unique index,
    /// so the same payment can never be applied twice.
    pub async fn apply_allocation(&self, plan: &AllocationPlan) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        for update in &plan.updates {
            let result = sqlx::query(
                r#"
                UPDATE receivables SET
                    amount_paid_cents = ?,
                    status = ?,
                    paid_at = ?,
                    paid_by = ?,
                    updated_at = ?
                WHERE id = ? AND status = 'pending' AND amount_paid_cents = ?
                "#,
            )
            .bind(update.new_paid_cents)
            .bind(update.new_status)
            .bind(update.paid_at)
            .bind(&update.paid_by)
            .bind(now)
            .bind(&update.receivable_id)
            .bind(update.expected_paid_cents)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                // Dropping tx rolls back everything applied so far.
                return Err(DbError::conflict("Receivable", &update.receivable_id));
            }
        }

        self.append_audit_tx(&mut tx, &plan.audit).await?;

        tx.commit().await?;

        info!(
            allocation_id = %plan.allocation_id,
            customer_id = %plan.audit.customer_id,
            records = plan.updates.len(),
            applied_cents = plan.applied_total_cents(),
            "Allocation applied"
        );

        Ok(())
    }

    /// Appends an audit entry inside an open transaction.
    async fn append_audit_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        entry: &CreditAuditEntry,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO credit_audit (
                id, allocation_id, customer_id, action,
                prior_balance_cents, new_balance_cents,
                note, actor_id, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.allocation_id)
        .bind(&entry.customer_id)
        .bind(entry.action)
        .bind(entry.prior_balance_cents)
        .bind(entry.new_balance_cents)
        .bind(&entry.note)
        .bind(&entry.actor_id)
        .bind(entry.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Lists the credit audit trail for a customer, newest first.
    pub async fn audit_for_customer(&self, customer_id: &str) -> DbResult<Vec<CreditAuditEntry>> {
        let entries = sqlx::query_as::<_, CreditAuditEntry>(
            r#"
            SELECT id, allocation_id, customer_id, action,
                   prior_balance_cents, new_balance_cents,
                   note, actor_id, created_at
            FROM credit_audit
            WHERE customer_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Lists overdue pending receivables across all customers.
    pub async fn list_overdue(&self, today: chrono::NaiveDate) -> DbResult<Vec<Receivable>> {
        let receivables = sqlx::query_as::<_, Receivable>(
            r#"
            SELECT id, customer_id, sale_id,
                   amount_cents, amount_paid_cents, due_date, status,
                   paid_at, paid_by, created_at, updated_at
            FROM receivables
            WHERE status = 'pending' AND due_date < ?
            ORDER BY due_date, id
            "#,
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        Ok(receivables)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::NaiveDate;
    use fiado_core::allocator::{allocate_payment, PaymentTender};
    use fiado_core::ReceivableStatus;

    async fn test_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_fixtures(db.pool()).await;
        db
    }

    /// Receivables and audit rows reference customers and users.
    async fn seed_fixtures(pool: &SqlitePool) {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO users (id, username, display_name, password_hash, role, is_active, created_at, updated_at)
             VALUES ('op-1', 'maria', 'Maria', 'x', 'cashier', 1, ?, ?)",
        )
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO customers (id, name, credit_limit_cents, is_active, created_at, updated_at)
             VALUES ('cust-1', 'João', 100000, 1, ?, ?)",
        )
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .unwrap();
    }

    fn receivable(id: &str, due: &str, amount: i64, paid: i64) -> Receivable {
        let now = Utc::now();
        Receivable {
            id: id.to_string(),
            customer_id: "cust-1".to_string(),
            sale_id: None,
            amount_cents: amount,
            amount_paid_cents: paid,
            due_date: due.parse::<NaiveDate>().unwrap(),
            status: ReceivableStatus::Pending,
            paid_at: None,
            paid_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn tender(amount: i64) -> PaymentTender {
        PaymentTender {
            customer_id: "cust-1".to_string(),
            amount_cents: amount,
            method: None,
            note: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_list_pending_ordering() {
        let db = test_db().await;
        let repo = db.receivables();

        repo.insert(&receivable("r-late", "2024-03-01", 5000, 0))
            .await
            .unwrap();
        repo.insert(&receivable("r-early", "2024-01-01", 10000, 0))
            .await
            .unwrap();

        let pending = repo.list_pending("cust-1").await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, "r-early");
        assert_eq!(pending[1].id, "r-late");

        assert_eq!(repo.outstanding_balance("cust-1").await.unwrap(), 15000);
    }

    #[tokio::test]
    async fn test_apply_allocation_updates_records_and_audit() {
        let db = test_db().await;
        let repo = db.receivables();

        repo.insert(&receivable("r1", "2024-01-01", 10000, 0))
            .await
            .unwrap();
        repo.insert(&receivable("r2", "2024-02-01", 5000, 0))
            .await
            .unwrap();

        let pending = repo.list_pending("cust-1").await.unwrap();
        let plan =
            allocate_payment("alloc-1", &tender(12000), &pending, "op-1", Utc::now()).unwrap();

        repo.apply_allocation(&plan).await.unwrap();

        let r1 = repo.get_by_id("r1").await.unwrap().unwrap();
        assert_eq!(r1.amount_paid_cents, 10000);
        assert_eq!(r1.status, ReceivableStatus::Paid);
        assert!(r1.paid_at.is_some());
        assert_eq!(r1.paid_by.as_deref(), Some("op-1"));

        let r2 = repo.get_by_id("r2").await.unwrap().unwrap();
        assert_eq!(r2.amount_paid_cents, 2000);
        assert_eq!(r2.status, ReceivableStatus::Pending);

        assert_eq!(repo.outstanding_balance("cust-1").await.unwrap(), 3000);

        let audit = repo.audit_for_customer("cust-1").await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].prior_balance_cents, 15000);
        assert_eq!(audit[0].new_balance_cents, 3000);
        assert_eq!(audit[0].actor_id, "op-1");
    }

    #[tokio::test]
    async fn test_apply_allocation_conflict_rolls_back() {
        let db = test_db().await;
        let repo = db.receivables();

        repo.insert(&receivable("r1", "2024-01-01", 10000, 0))
            .await
            .unwrap();
        repo.insert(&receivable("r2", "2024-02-01", 5000, 0))
            .await
            .unwrap();

        let pending = repo.list_pending("cust-1").await.unwrap();
        let plan =
            allocate_payment("alloc-1", &tender(12000), &pending, "op-1", Utc::now()).unwrap();

        // Simulate a racing allocation: r2's paid amount moved after the
        // plan was computed.
        sqlx::query("UPDATE receivables SET amount_paid_cents = 100 WHERE id = 'r2'")
            .execute(db.pool())
            .await
            .unwrap();

        let err = repo.apply_allocation(&plan).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        // r1 must NOT have been updated: the whole transaction rolled back.
        let r1 = repo.get_by_id("r1").await.unwrap().unwrap();
        assert_eq!(r1.amount_paid_cents, 0);
        assert_eq!(r1.status, ReceivableStatus::Pending);

        // And no audit entry landed.
        assert!(repo.audit_for_customer("cust-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_allocation_id_rejected() {
        let db = test_db().await;
        let repo = db.receivables();

        repo.insert(&receivable("r1", "2024-01-01", 10000, 0))
            .await
            .unwrap();

        let pending = repo.list_pending("cust-1").await.unwrap();
        let plan =
            allocate_payment("alloc-1", &tender(4000), &pending, "op-1", Utc::now()).unwrap();
        repo.apply_allocation(&plan).await.unwrap();

        // Retry with the same allocation id against fresh records: the
        // audit unique index refuses the duplicate.
        let pending = repo.list_pending("cust-1").await.unwrap();
        let retry =
            allocate_payment("alloc-1", &tender(4000), &pending, "op-1", Utc::now()).unwrap();
        let err = repo.apply_allocation(&retry).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        // The duplicate rolled back: only the first payment stands.
        let r1 = repo.get_by_id("r1").await.unwrap().unwrap();
        assert_eq!(r1.amount_paid_cents, 4000);
    }

    #[tokio::test]
    async fn test_list_overdue() {
        let db = test_db().await;
        let repo = db.receivables();

        repo.insert(&receivable("r1", "2024-01-01", 10000, 0))
            .await
            .unwrap();
        repo.insert(&receivable("r2", "2024-06-01", 5000, 0))
            .await
            .unwrap();

        let overdue = repo
            .list_overdue("2024-03-01".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, "r1");
    }
}
