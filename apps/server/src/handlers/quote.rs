//! Quote (orçamento) handlers: create, look up, convert into a sale.
//!
//! A quote freezes prices at creation time. Conversion reuses those frozen
//! snapshots, never current catalog prices, so the customer pays what was
//! quoted.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::sale::installment_schedule;
use crate::state::AppState;
use fiado_core::validation::{
    validate_due_date, validate_installments, validate_payment_amount, validate_quantity,
};
use fiado_core::{
    Capability, Cart, CoreError, Money, Payment, PaymentMethod, Quote, QuoteItem, QuoteStatus,
    Sale, SaleItem, SaleStatus,
};

#[derive(Debug, Deserialize)]
pub struct QuoteItemRequest {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub discount_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateQuoteRequest {
    pub customer_id: Option<String>,
    pub items: Vec<QuoteItemRequest>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub quote: Quote,
    pub items: Vec<QuoteItem>,
}

/// POST /quotes
pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateQuoteRequest>,
) -> ApiResult<(StatusCode, Json<QuoteResponse>)> {
    auth.require(Capability::ManageQuotes)?;

    if req.items.is_empty() {
        return Err(ApiError::BadRequest(
            "Quote must have at least one item".to_string(),
        ));
    }

    // A quote that expires before it exists is a data-entry mistake.
    if let Some(valid_until) = req.valid_until {
        if valid_until < Utc::now().date_naive() {
            return Err(ApiError::BadRequest(
                "valid_until must not be in the past".to_string(),
            ));
        }
    }

    if let Some(ref customer_id) = req.customer_id {
        state
            .db
            .customers()
            .get_by_id(customer_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Customer not found: {}", customer_id)))?;
    }

    // Same cart rules as checkout: frozen prices, bounded line discounts.
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

        cart.add_item(&product, line.quantity).map_err(ApiError::from)?;
        if line.discount_cents > 0 {
            cart.apply_line_discount(&product.id, line.discount_cents)
                .map_err(ApiError::from)?;
        }
    }

    let now = Utc::now();
    let quote_id = Uuid::new_v4().to_string();
    let quote_number = state.db.quotes().next_quote_number().await?;

    let quote = Quote {
        id: quote_id.clone(),
        quote_number,
        status: QuoteStatus::Open,
        customer_id: req.customer_id.clone(),
        subtotal_cents: cart.subtotal_cents(),
        discount_cents: cart.discount_cents(),
        total_cents: cart.total_cents(),
        valid_until: req.valid_until,
        created_by: auth.user_id.clone(),
        notes: req.notes.clone(),
        converted_sale_id: None,
        created_at: now,
        updated_at: now,
    };

    let items: Vec<QuoteItem> = cart
        .items
        .iter()
        .map(|line| QuoteItem {
            id: Uuid::new_v4().to_string(),
            quote_id: quote_id.clone(),
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

    state.db.quotes().create(&quote, &items).await?;
    info!(
        quote_number = %quote.quote_number,
        total_cents = quote.total_cents,
        by = %auth.username,
        "Quote created"
    );

    Ok((StatusCode::CREATED, Json(QuoteResponse { quote, items })))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /quotes
pub async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Quote>>> {
    auth.require(Capability::ManageQuotes)?;

    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    // Opportunistic expiry keeps listings honest without a scheduler.
    state.db.quotes().expire_stale(Utc::now().date_naive()).await?;

    let quotes = state.db.quotes().list(limit, offset).await?;
    Ok(Json(quotes))
}

/// GET /quotes/:id
pub async fn get(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<QuoteResponse>> {
    auth.require(Capability::ManageQuotes)?;

    let quote = state
        .db
        .quotes()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Quote not found: {}", id)))?;
    let items = state.db.quotes().get_items(&id).await?;

    Ok(Json(QuoteResponse { quote, items }))
}

#[derive(Debug, Deserialize)]
pub struct ConvertPayment {
    pub method: PaymentMethod,
    pub amount_cents: i64,
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    pub payments: Vec<ConvertPayment>,
    pub installments: Option<u32>,
    pub first_due_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub quote_id: String,
    pub sale: Sale,
}

/// POST /quotes/:id/convert
///
/// Creates a completed sale from the quote's frozen snapshots and marks
/// the quote converted, all in one transaction.
pub async fn convert(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ConvertRequest>,
) -> ApiResult<(StatusCode, Json<ConvertResponse>)> {
    auth.require(Capability::ManageQuotes)?;

    let quote = state
        .db
        .quotes()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Quote not found: {}", id)))?;

    let today = Utc::now().date_naive();
    if !quote.is_convertible(today) {
        let current_status = match quote.status {
            QuoteStatus::Open => "expired".to_string(), // open but past valid_until
            QuoteStatus::Converted => "converted".to_string(),
            QuoteStatus::Expired => "expired".to_string(),
        };
        return Err(CoreError::QuoteNotConvertible {
            quote_id: id,
            current_status,
        }
        .into());
    }

    if req.payments.is_empty() {
        return Err(ApiError::BadRequest(
            "Conversion requires at least one payment".to_string(),
        ));
    }

    let mut tendered = 0i64;
    let mut credit_cents = 0i64;
    for payment in &req.payments {
        validate_payment_amount(payment.amount_cents).map_err(CoreError::from)?;
        tendered += payment.amount_cents;
        if payment.method == PaymentMethod::Crediario {
            credit_cents += payment.amount_cents;
        }
    }
    if tendered != quote.total_cents {
        return Err(ApiError::BadRequest(format!(
            "Payments total {} centavos but the quoted total is {} centavos",
            tendered, quote.total_cents
        )));
    }

    let now = Utc::now();
    let sale_id = Uuid::new_v4().to_string();

    let receivables = if credit_cents > 0 {
        let customer_id = quote
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
                validate_due_date(date, today).map_err(CoreError::from)?;
                date
            }
            None => today
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

    let quote_items = state.db.quotes().get_items(&id).await?;
    let receipt_number = state.db.sales().next_receipt_number().await?;

    let sale = Sale {
        id: sale_id.clone(),
        receipt_number,
        status: SaleStatus::Completed,
        customer_id: quote.customer_id.clone(),
        subtotal_cents: quote.subtotal_cents,
        discount_cents: quote.discount_cents,
        total_cents: quote.total_cents,
        user_id: auth.user_id.clone(),
        notes: quote.notes.clone(),
        created_at: now,
        updated_at: now,
        completed_at: Some(now),
    };

    let items: Vec<SaleItem> = quote_items
        .iter()
        .map(|qi| SaleItem {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.clone(),
            product_id: qi.product_id.clone(),
            sku_snapshot: qi.sku_snapshot.clone(),
            name_snapshot: qi.name_snapshot.clone(),
            unit_price_cents: qi.unit_price_cents,
            quantity: qi.quantity,
            discount_cents: qi.discount_cents,
            line_total_cents: qi.line_total_cents,
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
        .quotes()
        .convert(&id, &sale, &items, &payments, &receivables)
        .await?;

    info!(
        quote_id = %id,
        receipt = %sale.receipt_number,
        total_cents = sale.total_cents,
        by = %auth.username,
        "Quote converted"
    );

    Ok((
        StatusCode::CREATED,
        Json(ConvertResponse { quote_id: id, sale }),
    ))
}
