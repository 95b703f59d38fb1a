//! Crediário handlers: pending balances, settlement, audit trail.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use fiado_core::{
    allocate_payment, Capability, CreditAuditEntry, PaymentMethod, PaymentTender, Receivable,
};
use fiado_db::DbError;

/// How many times a settlement is recomputed when a concurrent allocation
/// changes the records between plan and apply.
const MAX_SETTLE_ATTEMPTS: usize = 3;

#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub customer_id: String,
    pub outstanding_total_cents: i64,
    pub receivables: Vec<Receivable>,
}

/// GET /customers/:id/receivables
pub async fn list_pending(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> ApiResult<Json<PendingResponse>> {
    auth.require(Capability::SettleCredit)?;

    // 404 for unknown customers, empty list for settled ones.
    state
        .db
        .customers()
        .get_by_id(&customer_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Customer not found: {}", customer_id)))?;

    let receivables = state.db.receivables().list_pending(&customer_id).await?;
    let outstanding_total_cents = receivables
        .iter()
        .map(|r| r.outstanding().cents())
        .sum();

    Ok(Json(PendingResponse {
        customer_id,
        outstanding_total_cents,
        receivables,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SettleRequest {
    /// Client-generated idempotency key. Resubmitting the same settlement
    /// (e.g. after a network timeout) reuses the same id and is applied
    /// at most once.
    pub allocation_id: String,
    pub amount_cents: i64,
    pub method: Option<PaymentMethod>,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SettleResponse {
    pub allocation_id: String,
    pub applied_cents: i64,
    pub records_touched: usize,
    pub records_settled: usize,
    pub remaining_balance_cents: i64,
}

/// POST /customers/:id/receivables/settle
///
/// Reads the customer's pending records, computes the allocation plan, and
/// applies it atomically. If a concurrent settlement invalidates the plan's
/// pre-images, the plan is recomputed from fresh records and retried.
pub async fn settle(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
    Json(req): Json<SettleRequest>,
) -> ApiResult<Json<SettleResponse>> {
    auth.require(Capability::SettleCredit)?;

    if req.allocation_id.trim().is_empty() {
        return Err(ApiError::BadRequest("allocation_id is required".to_string()));
    }

    state
        .db
        .customers()
        .get_by_id(&customer_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Customer not found: {}", customer_id)))?;

    let tender = PaymentTender {
        customer_id: customer_id.clone(),
        amount_cents: req.amount_cents,
        method: req.method,
        note: req.note.clone(),
    };

    let repo = state.db.receivables();
    let mut last_conflict = None;

    for attempt in 1..=MAX_SETTLE_ATTEMPTS {
        let pending = repo.list_pending(&customer_id).await?;

        let plan = allocate_payment(
            &req.allocation_id,
            &tender,
            &pending,
            &auth.user_id,
            Utc::now(),
        )?;

        match repo.apply_allocation(&plan).await {
            Ok(()) => {
                let remaining = repo.outstanding_balance(&customer_id).await?;

                info!(
                    allocation_id = %plan.allocation_id,
                    customer_id = %customer_id,
                    applied_cents = plan.applied_total_cents(),
                    by = %auth.username,
                    "Credit payment settled"
                );

                return Ok(Json(SettleResponse {
                    allocation_id: plan.allocation_id.clone(),
                    applied_cents: plan.applied_total_cents(),
                    records_touched: plan.updates.len(),
                    records_settled: plan
                        .updates
                        .iter()
                        .filter(|u| u.paid_at.is_some())
                        .count(),
                    remaining_balance_cents: remaining,
                }));
            }
            // Lost the race: recompute the plan from fresh records.
            Err(DbError::Conflict { .. }) => {
                warn!(
                    allocation_id = %req.allocation_id,
                    customer_id = %customer_id,
                    attempt,
                    "Concurrent allocation detected, recomputing plan"
                );
                last_conflict = Some(ApiError::Conflict(
                    "Concurrent settlement in progress; retry".to_string(),
                ));
            }
            Err(other) => return Err(other.into()),
        }
    }

    Err(last_conflict
        .unwrap_or_else(|| ApiError::Internal("Settlement retry loop exhausted".to_string())))
}

/// GET /customers/:id/credit-audit
pub async fn audit(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> ApiResult<Json<Vec<CreditAuditEntry>>> {
    auth.require(Capability::SettleCredit)?;

    state
        .db
        .customers()
        .get_by_id(&customer_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Customer not found: {}", customer_id)))?;

    let entries = state
        .db
        .receivables()
        .audit_for_customer(&customer_id)
        .await?;

    Ok(Json(entries))
}
