//! # Error Types
//!
//! Domain-specific error types for fiado-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  fiado-core errors (this file)                                         │
//! │  ├── CoreError        - General domain errors                          │
//! │  ├── AllocationError  - Credit payment allocation failures             │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  fiado-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  HTTP API errors (in app)                                              │
//! │  └── ApiError         - What clients see (serialized)                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, ID, amounts)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Allocation Error
// =============================================================================

/// Failures of the credit payment allocator.
///
/// All variants are local, synchronous results of the allocation call and
/// are never retried automatically: the operator corrects the input.
/// Persistence failures are a separate concern (`DbError` in fiado-db).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocationError {
    /// Tendered amount is zero or negative.
    #[error("Invalid payment amount: {amount_cents} centavos (must be positive)")]
    InvalidAmount { amount_cents: i64 },

    /// Customer has no pending receivables.
    #[error("Customer {customer_id} has no open balance")]
    NoOpenBalance { customer_id: String },

    /// Tendered amount exceeds the total outstanding balance.
    ///
    /// Over-payment is refused rather than converted into store credit:
    /// the operator must adjust the tendered amount.
    #[error("Payment of {tendered_cents} centavos exceeds outstanding balance of {outstanding_cents} centavos")]
    AmountExceedsBalance {
        tendered_cents: i64,
        outstanding_cents: i64,
    },
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-friendly messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Customer cannot be found.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Sale not found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Quote not found.
    #[error("Quote not found: {0}")]
    QuoteNotFound(String),

    /// Quote is not in a state that allows conversion.
    ///
    /// ## When This Occurs
    /// - Converting an already converted quote
    /// - Converting an expired quote
    #[error("Quote {quote_id} is {current_status}, cannot convert")]
    QuoteNotConvertible {
        quote_id: String,
        current_status: String,
    },

    /// Sale is not in a state that allows the requested operation.
    #[error("Sale {sale_id} is {current_status}, cannot perform operation")]
    InvalidSaleStatus {
        sale_id: String,
        current_status: String,
    },

    /// A crediário sale was attempted without an identified customer.
    #[error("Crediário sales require a registered customer")]
    CreditRequiresCustomer,

    /// The sale would push the customer past their credit limit.
    #[error("Credit limit exceeded for {customer_id}: limit {limit_cents}, would owe {would_owe_cents}")]
    CreditLimitExceeded {
        customer_id: String,
        limit_cents: i64,
        would_owe_cents: i64,
    },

    /// Cart has exceeded maximum allowed items.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Per-item discount exceeds the line total.
    #[error("Discount of {discount_cents} centavos exceeds line total of {line_total_cents} centavos")]
    DiscountExceedsLineTotal {
        discount_cents: i64,
        line_total_cents: i64,
    },

    /// Allocation failure (wraps AllocationError).
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate SKU).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
