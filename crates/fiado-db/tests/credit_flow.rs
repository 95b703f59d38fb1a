//! End-to-end crediário lifecycle against an in-memory database:
//! a credit sale creates installments, partial payments chip away at them
//! oldest-first, and the final payment closes the balance with a full
//! audit trail.

use chrono::Utc;
use fiado_core::allocator::{allocate_payment, PaymentTender};
use fiado_core::{
    Money, Payment, PaymentMethod, Receivable, ReceivableStatus, Sale, SaleItem, SaleStatus,
};
use fiado_db::{Database, DbConfig};
use uuid::Uuid;

async fn seeded_db() -> Database {
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
         VALUES ('p1', 'CAFE-500', 'Café', 10000, 1, ?, ?)",
    )
    .bind(now)
    .bind(now)
    .execute(db.pool())
    .await
    .unwrap();

    db
}

fn tender(amount: i64) -> PaymentTender {
    PaymentTender {
        customer_id: "cust-1".to_string(),
        amount_cents: amount,
        method: Some(PaymentMethod::Cash),
        note: None,
    }
}

#[tokio::test]
async fn credit_sale_settles_oldest_first_until_closed() {
    let db = seeded_db().await;
    let now = Utc::now();

    // Crediário sale of R$300,00 in three installments.
    let sale_id = Uuid::new_v4().to_string();
    let sale = Sale {
        id: sale_id.clone(),
        receipt_number: "VND-000001".to_string(),
        status: SaleStatus::Completed,
        customer_id: Some("cust-1".to_string()),
        subtotal_cents: 30000,
        discount_cents: 0,
        total_cents: 30000,
        user_id: "op-1".to_string(),
        notes: None,
        created_at: now,
        updated_at: now,
        completed_at: Some(now),
    };
    let items = vec![SaleItem {
        id: Uuid::new_v4().to_string(),
        sale_id: sale_id.clone(),
        product_id: "p1".to_string(),
        sku_snapshot: "CAFE-500".to_string(),
        name_snapshot: "Café".to_string(),
        unit_price_cents: 10000,
        quantity: 3,
        discount_cents: 0,
        line_total_cents: 30000,
        created_at: now,
    }];
    let payments = vec![Payment {
        id: Uuid::new_v4().to_string(),
        sale_id: sale_id.clone(),
        method: PaymentMethod::Crediario,
        amount_cents: 30000,
        reference: None,
        created_at: now,
    }];

    let amounts = Money::from_cents(30000).split_installments(3);
    let due_dates = ["2024-01-15", "2024-02-15", "2024-03-15"];
    let receivables: Vec<Receivable> = amounts
        .iter()
        .zip(due_dates)
        .map(|(amount, due)| Receivable {
            id: Uuid::new_v4().to_string(),
            customer_id: "cust-1".to_string(),
            sale_id: Some(sale_id.clone()),
            amount_cents: amount.cents(),
            amount_paid_cents: 0,
            due_date: due.parse().unwrap(),
            status: ReceivableStatus::Pending,
            paid_at: None,
            paid_by: None,
            created_at: now,
            updated_at: now,
        })
        .collect();

    db.sales()
        .finalize(&sale, &items, &payments, &receivables)
        .await
        .unwrap();

    let repo = db.receivables();
    assert_eq!(repo.outstanding_balance("cust-1").await.unwrap(), 30000);

    // First payment: R$150,00 settles the January installment and part of
    // February's.
    let pending = repo.list_pending("cust-1").await.unwrap();
    let plan = allocate_payment("alloc-1", &tender(15000), &pending, "op-1", Utc::now()).unwrap();
    repo.apply_allocation(&plan).await.unwrap();

    let pending = repo.list_pending("cust-1").await.unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].due_date.to_string(), "2024-02-15");
    assert_eq!(repo.outstanding_balance("cust-1").await.unwrap(), 15000);

    // Second payment closes everything.
    let plan = allocate_payment("alloc-2", &tender(15000), &pending, "op-1", Utc::now()).unwrap();
    repo.apply_allocation(&plan).await.unwrap();

    assert!(repo.list_pending("cust-1").await.unwrap().is_empty());
    assert_eq!(repo.outstanding_balance("cust-1").await.unwrap(), 0);

    // Every record is marked paid with the settling operator recorded.
    for receivable in &receivables {
        let row = repo.get_by_id(&receivable.id).await.unwrap().unwrap();
        assert_eq!(row.status, ReceivableStatus::Paid);
        assert_eq!(row.amount_paid_cents, row.amount_cents);
        assert_eq!(row.paid_by.as_deref(), Some("op-1"));
        assert!(row.paid_at.is_some());
    }

    // Audit trail: two allocations, balances chaining 30000 → 15000 → 0.
    let audit = repo.audit_for_customer("cust-1").await.unwrap();
    assert_eq!(audit.len(), 2);
    let mut by_alloc = audit.clone();
    by_alloc.sort_by(|a, b| a.allocation_id.cmp(&b.allocation_id));
    assert_eq!(by_alloc[0].prior_balance_cents, 30000);
    assert_eq!(by_alloc[0].new_balance_cents, 15000);
    assert_eq!(by_alloc[1].prior_balance_cents, 15000);
    assert_eq!(by_alloc[1].new_balance_cents, 0);

    // A third payment has nothing to apply to.
    let pending = repo.list_pending("cust-1").await.unwrap();
    let err = allocate_payment("alloc-3", &tender(100), &pending, "op-1", Utc::now()).unwrap_err();
    assert_eq!(
        err,
        fiado_core::AllocationError::NoOpenBalance {
            customer_id: "cust-1".to_string()
        }
    );
}
