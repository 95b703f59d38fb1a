//! Product catalog handlers.

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
use fiado_core::validation::{validate_name, validate_price_cents, validate_search_query, validate_sku};
use fiado_core::{Capability, CoreError, Product};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Search term; when present, matches name/SKU/barcode.
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /products
pub async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    auth.require(Capability::Sell)?;

    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    let products = match query.q {
        Some(ref term) => {
            let term = validate_search_query(term).map_err(CoreError::from)?;
            state.db.products().search(&term, limit).await?
        }
        None => state.db.products().list_active(limit, offset).await?,
    };

    Ok(Json(products))
}

/// GET /products/:id
pub async fn get(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    auth.require(Capability::Sell)?;

    let product = state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Product not found: {}", id)))?;

    Ok(Json(product))
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub sku: String,
    pub barcode: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub cost_cents: Option<i64>,
    pub current_stock: Option<i64>,
}

/// POST /products
pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateProductRequest>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    auth.require(Capability::ManageProducts)?;

    validate_sku(&req.sku).map_err(CoreError::from)?;
    validate_name(&req.name).map_err(CoreError::from)?;
    validate_price_cents(req.price_cents).map_err(CoreError::from)?;

    let now = Utc::now();
    let product = Product {
        id: Uuid::new_v4().to_string(),
        sku: req.sku,
        barcode: req.barcode,
        name: req.name,
        description: req.description,
        price_cents: req.price_cents,
        cost_cents: req.cost_cents,
        current_stock: req.current_stock,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    state.db.products().insert(&product).await?;
    info!(product_id = %product.id, sku = %product.sku, by = %auth.username, "Product created");

    Ok((StatusCode::CREATED, Json(product)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub sku: String,
    pub barcode: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub cost_cents: Option<i64>,
    pub current_stock: Option<i64>,
    pub is_active: bool,
}

/// PUT /products/:id
pub async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateProductRequest>,
) -> ApiResult<Json<Product>> {
    auth.require(Capability::ManageProducts)?;

    validate_sku(&req.sku).map_err(CoreError::from)?;
    validate_name(&req.name).map_err(CoreError::from)?;
    validate_price_cents(req.price_cents).map_err(CoreError::from)?;

    let mut product = state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Product not found: {}", id)))?;

    product.sku = req.sku;
    product.barcode = req.barcode;
    product.name = req.name;
    product.description = req.description;
    product.price_cents = req.price_cents;
    product.cost_cents = req.cost_cents;
    product.current_stock = req.current_stock;
    product.is_active = req.is_active;
    product.updated_at = Utc::now();

    state.db.products().update(&product).await?;
    info!(product_id = %product.id, by = %auth.username, "Product updated");

    Ok(Json(product))
}

/// DELETE /products/:id (soft delete)
pub async fn deactivate(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    auth.require(Capability::ManageProducts)?;

    state.db.products().deactivate(&id).await?;
    info!(product_id = %id, by = %auth.username, "Product deactivated");

    Ok(StatusCode::NO_CONTENT)
}
