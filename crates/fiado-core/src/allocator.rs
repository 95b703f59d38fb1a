//! # Credit Payment Allocator
//!
//! Allocates a crediário payment across a customer's outstanding
//! receivables, oldest due date first.
//!
//! ## Allocation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Payment Allocation                                 │
//! │                                                                         │
//! │  Tender: R$120,00                                                       │
//! │                                                                         │
//! │  Pending receivables (sorted by due date, then id):                    │
//! │                                                                         │
//! │  R1  due 2024-01-01  owed R$100,00  paid R$0,00                        │
//! │      └── apply R$100,00 → paid in full, status = paid                  │
//! │                                                                         │
//! │  R2  due 2024-02-01  owed R$50,00   paid R$0,00                        │
//! │      └── apply R$20,00  → partially paid, status = pending             │
//! │                                                                         │
//! │  remaining = 0 → stop                                                  │
//! │                                                                         │
//! │  Audit: prior balance R$150,00 → new balance R$30,00                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Purity
//! `allocate_payment` owns no state and performs no I/O: it returns the
//! list of intended record updates plus the audit entry, deferring to the
//! caller (fiado-db's `apply_allocation`) to persist them atomically.
//! Validation failures occur before any update instruction is produced, so
//! no partial result is ever returned.
//!
//! ## Concurrency
//! Two allocations racing on the same customer are not coordinated here.
//! Each [`ReceivableUpdate`] carries the pre-image `expected_paid_cents` so
//! the store layer can reject a lost update optimistically and the caller
//! can re-read and retry the whole allocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AllocationError;
use crate::money::Money;
use crate::types::{CreditAction, CreditAuditEntry, PaymentMethod, Receivable, ReceivableStatus};

// =============================================================================
// Input / Output Types
// =============================================================================

/// A tendered crediário payment. Transient: input to one allocation run,
/// never persisted as its own entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentTender {
    pub customer_id: String,
    /// Tendered amount in centavos. Must be positive.
    pub amount_cents: i64,
    /// Settlement method chosen by the operator, when recorded.
    pub method: Option<PaymentMethod>,
    /// Free-text note for the audit trail.
    pub note: Option<String>,
}

/// An intended update to one receivable record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivableUpdate {
    pub receivable_id: String,
    /// `amount_paid_cents` observed when the plan was computed. The store
    /// applies the update only if the row still matches; a mismatch means
    /// a concurrent allocation won and this plan must be recomputed.
    pub expected_paid_cents: i64,
    /// Resulting `amount_paid_cents` after this allocation.
    pub new_paid_cents: i64,
    /// Portion of the tender applied to this record.
    pub applied_cents: i64,
    pub new_status: ReceivableStatus,
    /// Set when the record becomes fully paid.
    pub paid_at: Option<DateTime<Utc>>,
    pub paid_by: Option<String>,
}

/// The complete, not-yet-persisted outcome of one allocation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationPlan {
    /// Idempotency key for this run; the audit table holds a unique index
    /// on it so a retried plan cannot be applied twice.
    pub allocation_id: String,
    pub updates: Vec<ReceivableUpdate>,
    pub audit: CreditAuditEntry,
}

impl AllocationPlan {
    /// Total centavos applied across all updates. Always equals the tender.
    pub fn applied_total_cents(&self) -> i64 {
        self.updates.iter().map(|u| u.applied_cents).sum()
    }
}

// =============================================================================
// Allocation
// =============================================================================

/// Allocates `tender` across `pending` receivables, oldest due date first.
///
/// ## Validation (before any update is produced)
/// 1. `tender.amount_cents > 0`, else [`AllocationError::InvalidAmount`]
/// 2. `pending` non-empty, else [`AllocationError::NoOpenBalance`]
/// 3. tender does not exceed the summed outstanding balance, else
///    [`AllocationError::AmountExceedsBalance`]
///
/// ## Determinism
/// Records are sorted by `(due_date, id)`; for the same inputs the same
/// plan is produced. Ties on due date are broken by record id.
///
/// ## Arguments
/// * `allocation_id` - caller-supplied idempotency key (UUID v4 in practice)
/// * `now` - allocation time, stamped on records that become fully paid
pub fn allocate_payment(
    allocation_id: &str,
    tender: &PaymentTender,
    pending: &[Receivable],
    actor_id: &str,
    now: DateTime<Utc>,
) -> Result<AllocationPlan, AllocationError> {
    if tender.amount_cents <= 0 {
        return Err(AllocationError::InvalidAmount {
            amount_cents: tender.amount_cents,
        });
    }

    if pending.is_empty() {
        return Err(AllocationError::NoOpenBalance {
            customer_id: tender.customer_id.clone(),
        });
    }

    let prior_balance: Money = pending
        .iter()
        .map(Receivable::outstanding)
        .fold(Money::zero(), |acc, m| acc + m);

    let tendered = Money::from_cents(tender.amount_cents);
    if tendered > prior_balance {
        return Err(AllocationError::AmountExceedsBalance {
            tendered_cents: tendered.cents(),
            outstanding_cents: prior_balance.cents(),
        });
    }

    // Oldest due date first; id breaks ties for a deterministic order.
    let mut ordered: Vec<&Receivable> = pending.iter().collect();
    ordered.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.id.cmp(&b.id)));

    let mut remaining = tendered;
    let mut updates = Vec::new();

    for record in ordered {
        if remaining.is_zero() {
            break;
        }

        let outstanding = record.outstanding();
        if outstanding.is_zero() {
            // Already settled record slipped into the pending list; nothing
            // to apply, and emitting a no-op update would churn the row.
            continue;
        }

        let applied = remaining.min(outstanding);
        let new_paid = Money::from_cents(record.amount_paid_cents) + applied;
        let settled = new_paid.cents() >= record.amount_cents;

        updates.push(ReceivableUpdate {
            receivable_id: record.id.clone(),
            expected_paid_cents: record.amount_paid_cents,
            new_paid_cents: new_paid.cents(),
            applied_cents: applied.cents(),
            new_status: if settled {
                ReceivableStatus::Paid
            } else {
                ReceivableStatus::Pending
            },
            paid_at: settled.then_some(now),
            paid_by: settled.then(|| actor_id.to_string()),
        });

        remaining -= applied;
    }

    // Integer arithmetic plus the balance precondition guarantee exhaustion.
    debug_assert!(remaining.is_zero());

    let new_balance = prior_balance - tendered;

    let audit = CreditAuditEntry {
        id: uuid::Uuid::new_v4().to_string(),
        allocation_id: allocation_id.to_string(),
        customer_id: tender.customer_id.clone(),
        action: CreditAction::Payment,
        prior_balance_cents: prior_balance.cents(),
        new_balance_cents: new_balance.cents(),
        note: tender.note.clone(),
        actor_id: actor_id.to_string(),
        created_at: now,
    };

    Ok(AllocationPlan {
        allocation_id: allocation_id.to_string(),
        updates,
        audit,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn receivable(id: &str, due: &str, amount: i64, paid: i64) -> Receivable {
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
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn tender(amount: i64) -> PaymentTender {
        PaymentTender {
            customer_id: "cust-1".to_string(),
            amount_cents: amount,
            method: Some(PaymentMethod::Cash),
            note: Some("balcão".to_string()),
        }
    }

    fn run(amount: i64, pending: &[Receivable]) -> Result<AllocationPlan, AllocationError> {
        allocate_payment("alloc-1", &tender(amount), pending, "operator-1", Utc::now())
    }

    #[test]
    fn test_partial_allocation_oldest_first() {
        // R1 due 2024-01-01 R$100,00, R2 due 2024-02-01 R$50,00; tender R$120,00
        let pending = vec![
            receivable("r1", "2024-01-01", 10000, 0),
            receivable("r2", "2024-02-01", 5000, 0),
        ];

        let plan = run(12000, &pending).unwrap();

        assert_eq!(plan.updates.len(), 2);

        let r1 = &plan.updates[0];
        assert_eq!(r1.receivable_id, "r1");
        assert_eq!(r1.new_paid_cents, 10000);
        assert_eq!(r1.new_status, ReceivableStatus::Paid);
        assert!(r1.paid_at.is_some());
        assert_eq!(r1.paid_by.as_deref(), Some("operator-1"));

        let r2 = &plan.updates[1];
        assert_eq!(r2.receivable_id, "r2");
        assert_eq!(r2.new_paid_cents, 2000);
        assert_eq!(r2.new_status, ReceivableStatus::Pending);
        assert!(r2.paid_at.is_none());
        assert!(r2.paid_by.is_none());
    }

    #[test]
    fn test_full_settlement() {
        let pending = vec![
            receivable("r1", "2024-01-01", 10000, 0),
            receivable("r2", "2024-02-01", 5000, 0),
        ];

        let plan = run(15000, &pending).unwrap();

        assert!(plan
            .updates
            .iter()
            .all(|u| u.new_status == ReceivableStatus::Paid));
        assert_eq!(plan.audit.new_balance_cents, 0);
    }

    #[test]
    fn test_amount_exceeds_balance_produces_no_updates() {
        let pending = vec![
            receivable("r1", "2024-01-01", 10000, 0),
            receivable("r2", "2024-02-01", 5000, 0),
        ];

        let err = run(20000, &pending).unwrap_err();
        assert_eq!(
            err,
            AllocationError::AmountExceedsBalance {
                tendered_cents: 20000,
                outstanding_cents: 15000,
            }
        );
    }

    #[test]
    fn test_no_open_balance() {
        let err = run(1000, &[]).unwrap_err();
        assert!(matches!(err, AllocationError::NoOpenBalance { .. }));
    }

    #[test]
    fn test_invalid_amount() {
        let pending = vec![receivable("r1", "2024-01-01", 10000, 0)];

        assert!(matches!(
            run(-500, &pending).unwrap_err(),
            AllocationError::InvalidAmount { amount_cents: -500 }
        ));
        assert!(matches!(
            run(0, &pending).unwrap_err(),
            AllocationError::InvalidAmount { .. }
        ));
    }

    /// Conservation: applied amounts always sum to the tender.
    #[test]
    fn test_conservation() {
        let pending = vec![
            receivable("r1", "2024-03-01", 3333, 100),
            receivable("r2", "2024-01-15", 7777, 0),
            receivable("r3", "2024-02-01", 1234, 1000),
        ];

        for amount in [1, 50, 4999, 11244] {
            let plan = run(amount, &pending).unwrap();
            assert_eq!(plan.applied_total_cents(), amount, "tender {amount}");
        }
    }

    /// Earlier-due records are fully settled before later ones get anything.
    #[test]
    fn test_oldest_first_ordering() {
        let pending = vec![
            receivable("r-late", "2024-03-01", 5000, 0),
            receivable("r-early", "2024-01-01", 5000, 0),
        ];

        let plan = run(5000, &pending).unwrap();

        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].receivable_id, "r-early");
        assert_eq!(plan.updates[0].new_status, ReceivableStatus::Paid);
    }

    /// Same due date: ties broken by record id for determinism.
    #[test]
    fn test_due_date_tie_broken_by_id() {
        let pending = vec![
            receivable("rb", "2024-01-01", 5000, 0),
            receivable("ra", "2024-01-01", 5000, 0),
        ];

        let plan = run(5000, &pending).unwrap();
        assert_eq!(plan.updates[0].receivable_id, "ra");
    }

    /// No over-payment: every update respects amount_paid <= amount.
    #[test]
    fn test_no_overpayment_per_record() {
        let pending = vec![
            receivable("r1", "2024-01-01", 2500, 500),
            receivable("r2", "2024-02-01", 2500, 0),
        ];

        let plan = run(4500, &pending).unwrap();
        assert_eq!(plan.updates[0].new_paid_cents, 2500);
        assert_eq!(plan.updates[1].new_paid_cents, 2500);
    }

    /// Status is paid iff the new paid amount reaches the record amount.
    #[test]
    fn test_status_correctness() {
        let pending = vec![receivable("r1", "2024-01-01", 10000, 0)];

        let exact = run(10000, &pending).unwrap();
        assert_eq!(exact.updates[0].new_status, ReceivableStatus::Paid);

        let partial = run(9999, &pending).unwrap();
        assert_eq!(partial.updates[0].new_status, ReceivableStatus::Pending);
        assert!(partial.updates[0].paid_at.is_none());
    }

    /// Audit consistency: new balance == prior balance − tender.
    #[test]
    fn test_audit_balances() {
        let pending = vec![
            receivable("r1", "2024-01-01", 10000, 2000),
            receivable("r2", "2024-02-01", 5000, 0),
        ];

        let plan = run(6000, &pending).unwrap();

        assert_eq!(plan.audit.prior_balance_cents, 13000);
        assert_eq!(plan.audit.new_balance_cents, 7000);
        assert_eq!(plan.audit.customer_id, "cust-1");
        assert_eq!(plan.audit.actor_id, "operator-1");
        assert_eq!(plan.audit.note.as_deref(), Some("balcão"));
        assert_eq!(plan.audit.action, CreditAction::Payment);
    }

    /// Optimistic pre-image: updates carry the paid amount seen at plan time.
    #[test]
    fn test_expected_paid_preimage() {
        let pending = vec![receivable("r1", "2024-01-01", 10000, 2500)];

        let plan = run(1000, &pending).unwrap();
        assert_eq!(plan.updates[0].expected_paid_cents, 2500);
        assert_eq!(plan.updates[0].new_paid_cents, 3500);
    }

    /// Partial payment against an already partially paid record.
    #[test]
    fn test_repeated_partial_payments_close_exactly() {
        let mut record = receivable("r1", "2024-01-01", 10000, 0);

        // Pay in three uneven installments; integer arithmetic must close
        // the record at exactly zero outstanding.
        for amount in [3333, 3333, 3334] {
            let plan = run(amount, std::slice::from_ref(&record)).unwrap();
            record.amount_paid_cents = plan.updates[0].new_paid_cents;
            record.status = plan.updates[0].new_status;
        }

        assert_eq!(record.amount_paid_cents, 10000);
        assert_eq!(record.status, ReceivableStatus::Paid);
    }

    /// Records with zero outstanding are skipped without emitting updates.
    #[test]
    fn test_settled_records_skipped() {
        let pending = vec![
            receivable("r0", "2023-12-01", 5000, 5000),
            receivable("r1", "2024-01-01", 5000, 0),
        ];

        let plan = run(5000, &pending).unwrap();
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].receivable_id, "r1");
    }
}
