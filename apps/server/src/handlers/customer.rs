//! Customer handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use fiado_core::validation::{validate_document, validate_name, validate_search_query};
use fiado_core::{Capability, CoreError, Customer};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /customers
pub async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Customer>>> {
    auth.require(Capability::Sell)?;

    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    let customers = match query.q {
        Some(ref term) => {
            let term = validate_search_query(term).map_err(CoreError::from)?;
            state.db.customers().search(&term, limit).await?
        }
        None => state.db.customers().list_active(limit, offset).await?,
    };

    Ok(Json(customers))
}

/// GET /customers/:id
pub async fn get(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Customer>> {
    auth.require(Capability::Sell)?;

    let customer = state
        .db
        .customers()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Customer not found: {}", id)))?;

    Ok(Json(customer))
}

#[derive(Debug, Deserialize)]
pub struct CreateCustomerRequest {
    pub name: String,
    pub document: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub credit_limit_cents: i64,
}

/// POST /customers
pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateCustomerRequest>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    auth.require(Capability::Sell)?;

    validate_name(&req.name).map_err(CoreError::from)?;
    if let Some(ref document) = req.document {
        validate_document(document).map_err(CoreError::from)?;
    }
    if req.credit_limit_cents < 0 {
        return Err(ApiError::BadRequest(
            "credit_limit_cents must not be negative".to_string(),
        ));
    }

    let now = Utc::now();
    let customer = Customer {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        document: req.document,
        phone: req.phone,
        credit_limit_cents: req.credit_limit_cents,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    state.db.customers().insert(&customer).await?;
    info!(customer_id = %customer.id, by = %auth.username, "Customer created");

    Ok((StatusCode::CREATED, Json(customer)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCustomerRequest {
    pub name: String,
    pub document: Option<String>,
    pub phone: Option<String>,
    pub credit_limit_cents: i64,
    pub is_active: bool,
}

/// PUT /customers/:id
pub async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCustomerRequest>,
) -> ApiResult<Json<Customer>> {
    auth.require(Capability::Sell)?;

    validate_name(&req.name).map_err(CoreError::from)?;
    if let Some(ref document) = req.document {
        validate_document(document).map_err(CoreError::from)?;
    }
    if req.credit_limit_cents < 0 {
        return Err(ApiError::BadRequest(
            "credit_limit_cents must not be negative".to_string(),
        ));
    }

    let mut customer = state
        .db
        .customers()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Customer not found: {}", id)))?;

    customer.name = req.name;
    customer.document = req.document;
    customer.phone = req.phone;
    customer.credit_limit_cents = req.credit_limit_cents;
    customer.is_active = req.is_active;
    customer.updated_at = Utc::now();

    state.db.customers().update(&customer).await?;
    info!(customer_id = %customer.id, by = %auth.username, "Customer updated");

    Ok(Json(customer))
}
