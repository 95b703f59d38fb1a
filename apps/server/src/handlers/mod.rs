//! # HTTP Handlers
//!
//! One module per resource. Handlers stay thin: parse the request, check
//! the operator's capability, call fiado-core / fiado-db, shape the reply.

pub mod auth;
pub mod customer;
pub mod dashboard;
pub mod product;
pub mod quote;
pub mod receivable;
pub mod sale;
pub mod user;

use std::time::Duration;

use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Requests that outlive this are cut off with 408; nothing in the API
/// should take anywhere near this long.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Authentication
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/me", get(auth::me))
        // Catalog
        .route("/products", get(product::list).post(product::create))
        .route(
            "/products/:id",
            get(product::get).put(product::update).delete(product::deactivate),
        )
        // Customers
        .route("/customers", get(customer::list).post(customer::create))
        .route("/customers/:id", get(customer::get).put(customer::update))
        // Crediário
        .route("/customers/:id/receivables", get(receivable::list_pending))
        .route("/customers/:id/receivables/settle", post(receivable::settle))
        .route("/customers/:id/credit-audit", get(receivable::audit))
        // Sales
        .route("/sales", get(sale::list).post(sale::checkout))
        .route("/sales/:id", get(sale::get))
        .route("/sales/:id/void", post(sale::void))
        // Quotes
        .route("/quotes", get(quote::list).post(quote::create))
        .route("/quotes/:id", get(quote::get))
        .route("/quotes/:id/convert", post(quote::convert))
        // Users
        .route("/users", get(user::list).post(user::create))
        .route("/users/:id/deactivate", post(user::deactivate))
        .route("/users/:id/password", put(user::change_password))
        // Dashboard
        .route("/dashboard/summary", get(dashboard::summary))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(REQUEST_TIMEOUT)),
        )
        .with_state(state)
}

/// Liveness probe. No authentication.
async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<serde_json::Value> {
    let db_ok = state.db.health_check().await;
    Json(json!({
        "status": if db_ok { "ok" } else { "degraded" },
        "database": db_ok,
    }))
}
