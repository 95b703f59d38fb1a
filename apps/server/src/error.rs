//! Error types for the HTTP API.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CoreError / AllocationError   (business rules, fiado-core)            │
//! │  DbError                       (persistence, fiado-db)                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError  ──►  HTTP status + JSON body {"error": {code, message}}     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use fiado_core::{AllocationError, CoreError};
use fiado_db::DbError;

/// API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Business rule rejection (allocator refusals, credit limit, etc.).
    #[error("{1}")]
    Unprocessable(&'static str, String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unprocessable(_, _) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for clients.
    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Unprocessable(code, _) => code,
            ApiError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal details are logged, never sent to clients.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "Internal error");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} not found: {}", entity, id))
            }
            DbError::UniqueViolation { field, .. } => {
                ApiError::Conflict(format!("Duplicate value for {}", field))
            }
            DbError::Conflict { entity, id } => ApiError::Conflict(format!(
                "Concurrent modification of {} {}; retry",
                entity, id
            )),
            DbError::ForeignKeyViolation { message } => ApiError::BadRequest(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AllocationError> for ApiError {
    fn from(err: AllocationError) -> Self {
        let code = match err {
            AllocationError::InvalidAmount { .. } => "invalid_amount",
            AllocationError::NoOpenBalance { .. } => "no_open_balance",
            AllocationError::AmountExceedsBalance { .. } => "amount_exceeds_balance",
        };
        ApiError::Unprocessable(code, err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(_)
            | CoreError::CustomerNotFound(_)
            | CoreError::SaleNotFound(_)
            | CoreError::QuoteNotFound(_) => ApiError::NotFound(err.to_string()),
            CoreError::Allocation(inner) => inner.into(),
            CoreError::QuoteNotConvertible { .. } => {
                ApiError::Unprocessable("quote_not_convertible", err.to_string())
            }
            CoreError::CreditLimitExceeded { .. } => {
                ApiError::Unprocessable("credit_limit_exceeded", err.to_string())
            }
            CoreError::CreditRequiresCustomer => {
                ApiError::Unprocessable("credit_requires_customer", err.to_string())
            }
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
