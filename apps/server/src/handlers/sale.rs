//! Sale handlers: checkout, lookup, void.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request items ──► Cart (frozen prices, line discounts) ──► totals     │
//! │  request payments ──► must sum to the cart total                       │
//! │       │                                                                 │
//! │       ├─ crediário portion > 0?                                        │
//! │       │    • customer required                                          │
//! │       │    • outstanding + portion must fit the credit limit            │
//! │       │    • portion split into N installments (remainder on first)     │
//! │       ▼                                                                 │
//! │  SaleRepository::finalize(...)  — one transaction                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use fiado_core::validation::{
    validate_due_date, validate_installments, validate_payment_amount, validate_quantity,
};
use fiado_core::{
    Capability, Cart, CoreError, Money, Payment, PaymentMethod, Receivable, ReceivableStatus,
    Sale, SaleItem, SaleStatus,
};

#[derive(Debug, Deserialize)]
pub struct CheckoutItem {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub discount_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutPayment {
    pub method: PaymentMethod,
    pub amount_cents: i64,
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub customer_id: Option<String>,
    pub items: Vec<CheckoutItem>,
    pub payments: Vec<CheckoutPayment>,
    /// Number of crediário installments; defaults to 1.
    pub installments: Option<u32>,
    /// Due date of the first installment; defaults to 30 days from today.
    pub first_due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SaleResponse {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    pub payments: Vec<Payment>,
    pub receivables: Vec<Receivable>,
}

/// POST /sales (checkout)
pub async fn checkout(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<SaleResponse>)> {
    auth.require(Capability::Sell)?;

    if req.items.is_empty() {
        return Err(ApiError::BadRequest("Sale must have at least one item".to_string()));
    }
    if req.payments.is_empty() {
        return Err(ApiError::BadRequest("Sale must have at least one payment".to_string()));
    }

    // Build the cart, freezing product data at checkout time.
    let mut cart = Cart::new();
    for line in &req.items {
        validate_quantity(line.quantity).map_err(CoreError::from)?;

        let product = state
            .db
            .products()
            .get_by_id(&line.product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| {
                ApiError::NotFound(format!("Product not found: {}", line.product_id))
            })?;

        cart.add_item(&product, line.quantity)
            .map_err(ApiError::from)?;
        if line.discount_cents > 0 {
            cart.apply_line_discount(&product.id, line.discount_cents)
                .map_err(ApiError::from)?;
        }
    }

    let total_cents = cart.total_cents();

    // Payments must cover the total exactly; change handling is the
    // register's job, not the server's.
    let mut tendered = 0i64;
    let mut credit_cents = 0i64;
    for payment in &req.payments {
        validate_payment_amount(payment.amount_cents).map_err(CoreError::from)?;
        tendered += payment.amount_cents;
        if payment.method == PaymentMethod::Crediario {
            credit_cents += payment.amount_cents;
        }
    }
    if tendered != total_cents {
        return Err(ApiError::BadRequest(format!(
            "Payments total {} centavos but the sale total is {} centavos",
            tendered, total_cents
        )));
    }

    let now = Utc::now();
    let sale_id = Uuid::new_v4().to_string();

    // Crediário portion: customer, credit limit, installment schedule.
    let receivables = if credit_cents > 0 {
        let customer_id = req
            .customer_id
            .as_deref()
            .ok_or(CoreError::CreditRequiresCustomer)
            .map_err(ApiError::from)?;

        let customer = state
            .db
            .customers()
            .get_by_id(customer_id)
            .await?
            .filter(|c| c.is_active)
            .ok_or_else(|| ApiError::NotFound(format!("Customer not found: {}", customer_id)))?;

        let outstanding = state
            .db
            .receivables()
            .outstanding_balance(customer_id)
            .await?;
        let would_owe = outstanding + credit_cents;
        if would_owe > customer.credit_limit_cents {
            return Err(CoreError::CreditLimitExceeded {
                customer_id: customer_id.to_string(),
                limit_cents: customer.credit_limit_cents,
                would_owe_cents: would_owe,
            }
            .into());
        }

        let parts = req.installments.unwrap_or(1);
        validate_installments(parts).map_err(CoreError::from)?;

        let first_due = match req.first_due_date {
            Some(date) => {
                validate_due_date(date, now.date_naive()).map_err(CoreError::from)?;
                date
            }
            None => now
                .date_naive()
                .checked_add_days(Days::new(30))
                .ok_or_else(|| ApiError::BadRequest("Due date out of range".to_string()))?,
        };

        installment_schedule(
            Money::from_cents(credit_cents),
            parts,
            first_due,
            customer_id,
            &sale_id,
            now,
        )?
    } else {
        Vec::new()
    };

    let receipt_number = state.db.sales().next_receipt_number().await?;

    let sale = Sale {
        id: sale_id.clone(),
        receipt_number,
        status: SaleStatus::Completed,
        customer_id: req.customer_id.clone(),
        subtotal_cents: cart.subtotal_cents(),
        discount_cents: cart.discount_cents(),
        total_cents,
        user_id: auth.user_id.clone(),
        notes: req.notes.clone(),
        created_at: now,
        updated_at: now,
        completed_at: Some(now),
    };

    let items: Vec<SaleItem> = cart
        .items
        .iter()
        .map(|line| SaleItem {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.clone(),
            product_id: line.product_id.clone(),
            sku_snapshot: line.sku.clone(),
            name_snapshot: line.name.clone(),
            unit_price_cents: line.unit_price_cents,
            quantity: line.quantity,
            discount_cents: line.discount_cents,
            line_total_cents: line.line_total_cents(),
            created_at: now,
        })
        .collect();

    let payments: Vec<Payment> = req
        .payments
        .iter()
        .map(|p| Payment {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.clone(),
            method: p.method,
            amount_cents: p.amount_cents,
            reference: p.reference.clone(),
            created_at: now,
        })
        .collect();

    state
        .db
        .sales()
        .finalize(&sale, &items, &payments, &receivables)
        .await?;

    info!(
        receipt = %sale.receipt_number,
        total_cents = sale.total_cents,
        credit_cents,
        installments = receivables.len(),
        by = %auth.username,
        "Checkout complete"
    );

    Ok((
        StatusCode::CREATED,
        Json(SaleResponse {
            sale,
            items,
            payments,
            receivables,
        }),
    ))
}

/// Builds the crediário installment records for a finalized sale.
///
/// The amount is split with the remainder on the first installment; due
/// dates advance one calendar month per installment.
pub(crate) fn installment_schedule(
    credit_total: Money,
    parts: u32,
    first_due: NaiveDate,
    customer_id: &str,
    sale_id: &str,
    now: DateTime<Utc>,
) -> ApiResult<Vec<Receivable>> {
    let amounts = credit_total.split_installments(parts);

    let mut receivables = Vec::with_capacity(amounts.len());
    for (index, amount) in amounts.iter().enumerate() {
        let due_date = first_due
            .checked_add_months(Months::new(index as u32))
            .ok_or_else(|| ApiError::BadRequest("Due date out of range".to_string()))?;

        receivables.push(Receivable {
            id: Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            sale_id: Some(sale_id.to_string()),
            amount_cents: amount.cents(),
            amount_paid_cents: 0,
            due_date,
            status: ReceivableStatus::Pending,
            paid_at: None,
            paid_by: None,
            created_at: now,
            updated_at: now,
        });
    }

    Ok(receivables)
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /sales
pub async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Sale>>> {
    auth.require(Capability::Sell)?;

    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    let sales = state.db.sales().list_recent(limit, offset).await?;
    Ok(Json(sales))
}

/// GET /sales/:id
pub async fn get(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SaleResponse>> {
    auth.require(Capability::Sell)?;

    let sale = state
        .db
        .sales()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Sale not found: {}", id)))?;

    let items = state.db.sales().get_items(&id).await?;
    let payments = state.db.sales().get_payments(&id).await?;
    let receivables = state.db.receivables().list_for_sale(&id).await?;

    Ok(Json(SaleResponse {
        sale,
        items,
        payments,
        receivables,
    }))
}

/// POST /sales/:id/void
pub async fn void(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    auth.require(Capability::Sell)?;

    state.db.sales().void(&id).await?;
    info!(sale_id = %id, by = %auth.username, "Sale voided");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_installment_schedule_splits_and_dates() {
        let receivables = installment_schedule(
            Money::from_cents(10000),
            3,
            "2024-01-15".parse().unwrap(),
            "cust-1",
            "sale-1",
            Utc::now(),
        )
        .unwrap();

        assert_eq!(receivables.len(), 3);
        // Remainder lands on the first installment: 3334 + 3333 + 3333
        assert_eq!(receivables[0].amount_cents, 3334);
        assert_eq!(receivables[1].amount_cents, 3333);
        assert_eq!(receivables[2].amount_cents, 3333);

        assert_eq!(receivables[0].due_date.to_string(), "2024-01-15");
        assert_eq!(receivables[1].due_date.to_string(), "2024-02-15");
        assert_eq!(receivables[2].due_date.to_string(), "2024-03-15");

        let total: i64 = receivables.iter().map(|r| r.amount_cents).sum();
        assert_eq!(total, 10000);
    }

    #[test]
    fn test_installment_schedule_month_end_clamps() {
        let receivables = installment_schedule(
            Money::from_cents(6000),
            2,
            "2024-01-31".parse().unwrap(),
            "cust-1",
            "sale-1",
            Utc::now(),
        )
        .unwrap();

        // January 31 + 1 month clamps to February 29 (leap year)
        assert_eq!(receivables[1].due_date.to_string(), "2024-02-29");
    }
}
