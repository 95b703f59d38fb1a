//! # fiado-core: Pure Business Logic for Fiado POS
//!
//! This crate is the **heart** of Fiado POS. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Fiado POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    HTTP API (apps/server)                       │   │
//! │  │    login, products, quotes, checkout, settle, dashboard         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ fiado-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ allocator │  │   cart    │  │   │
//! │  │   │ Receivable│  │   Money   │  │ oldest-due│  │ per-line  │  │   │
//! │  │   │   Quote   │  │ centavos  │  │   first   │  │ discounts │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    fiado-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, Quote, Receivable, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`allocator`] - Crediário payment allocation, oldest due date first
//! - [`cart`] - POS cart with per-item discounting
//! - [`rbac`] - Closed role enumeration with capability checks
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in centavos (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocator;
pub mod cart;
pub mod error;
pub mod money;
pub mod rbac;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use fiado_core::Money` instead of
// `use fiado_core::money::Money`

pub use allocator::{allocate_payment, AllocationPlan, PaymentTender, ReceivableUpdate};
pub use cart::{Cart, CartItem, CartTotals};
pub use error::{AllocationError, CoreError, ValidationError};
pub use money::Money;
pub use rbac::{Capability, Role};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum items allowed in a single cart
///
/// Prevents runaway carts and ensures reasonable transaction sizes.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single item in cart
///
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum number of crediário installments per sale
pub const MAX_INSTALLMENTS: i64 = 24;
