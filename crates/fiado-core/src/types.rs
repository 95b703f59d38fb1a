//! # Domain Types
//!
//! Core domain types used throughout Fiado POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │   Receivable    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  sku (business) │   │  receipt_number │   │  customer_id    │       │
//! │  │  name           │   │  status         │   │  amount_cents   │       │
//! │  │  price_cents    │   │  total_cents    │   │  amount_paid    │       │
//! │  └─────────────────┘   └─────────────────┘   │  due_date       │       │
//! │                                              └─────────────────┘       │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Quote       │   │  PaymentMethod  │   │ CreditAuditEntry│       │
//! │  │  (orçamento)    │   │  Cash           │   │  prior_balance  │       │
//! │  │  convertible    │   │  ExternalCard   │   │  new_balance    │       │
//! │  │  into a Sale    │   │  Pix            │   │  actor_id       │       │
//! │  └─────────────────┘   │  Crediario      │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku, receipt_number, quote_number) - human-readable

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::rbac::Role;

// =============================================================================
// User
// =============================================================================

/// An operator account.
///
/// Every account carries exactly one [`Role`]; authorization is a
/// capability check against that role, never a string comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub username: String,
    pub display_name: String,
    /// Argon2 hash; never the plain password.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Barcode (EAN-13, UPC-A, etc.).
    pub barcode: Option<String>,

    /// Display name shown to the operator and on the receipt.
    pub name: String,

    /// Optional description for product details.
    pub description: Option<String>,

    /// Price in centavos (smallest currency unit).
    pub price_cents: i64,

    /// Cost in centavos (for margin reporting).
    pub cost_cents: Option<i64>,

    /// Current stock level, when tracked.
    pub current_stock: Option<i64>,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A registered customer.
///
/// Customers are required for crediário sales and quotes; cash sales may be
/// anonymous.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub name: String,
    /// CPF/CNPJ document, digits only.
    pub document: Option<String>,
    pub phone: Option<String>,
    /// Maximum total outstanding balance allowed on credit, in centavos.
    pub credit_limit_cents: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Sale is in progress (items being added).
    Draft,
    /// Sale has been paid and finalized.
    Completed,
    /// Sale was cancelled/refunded.
    Voided,
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Draft
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on external terminal.
    ExternalCard,
    /// Pix instant transfer.
    Pix,
    /// Store credit: the total becomes one or more receivables.
    Crediario,
}

// =============================================================================
// Sale
// =============================================================================

/// A completed or in-progress sale transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    pub receipt_number: String,
    pub status: SaleStatus,
    /// Required for crediário sales, optional otherwise.
    pub customer_id: Option<String>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    /// Operator who rang the sale.
    pub user_id: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// SKU at time of sale (frozen).
    pub sku_snapshot: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    /// Unit price in centavos at time of sale (frozen).
    pub unit_price_cents: i64,
    /// Quantity sold.
    pub quantity: i64,
    /// Per-item discount applied to this line, in centavos.
    pub discount_cents: i64,
    /// Line total after discount (unit_price × quantity − discount).
    pub line_total_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Payment
// =============================================================================

/// A payment towards a sale.
/// A sale can have multiple payments for split tender scenarios.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: String,
    pub sale_id: String,
    pub method: PaymentMethod,
    /// Amount paid in centavos.
    pub amount_cents: i64,
    /// External reference (card auth code, pix txid, etc.).
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Quote (Orçamento)
// =============================================================================

/// The status of a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    /// Saved draft, convertible into a sale.
    Open,
    /// Converted: a sale was created from this quote.
    Converted,
    /// Past its validity date; conversion refused.
    Expired,
}

/// A saved, uncommitted sale draft (orçamento) convertible into a sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Quote {
    pub id: String,
    /// Human-readable business number, unique.
    pub quote_number: String,
    pub status: QuoteStatus,
    pub customer_id: Option<String>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    /// Last day the quoted prices are honored.
    pub valid_until: Option<NaiveDate>,
    pub created_by: String,
    pub notes: Option<String>,
    /// Set when the quote is converted.
    pub converted_sale_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quote {
    /// Whether the quote can still be converted on `today`.
    pub fn is_convertible(&self, today: NaiveDate) -> bool {
        if self.status != QuoteStatus::Open {
            return false;
        }
        match self.valid_until {
            Some(limit) => today <= limit,
            None => true,
        }
    }
}

/// A line item in a quote. Same snapshot pattern as [`SaleItem`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct QuoteItem {
    pub id: String,
    pub quote_id: String,
    pub product_id: String,
    pub sku_snapshot: String,
    pub name_snapshot: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub discount_cents: i64,
    pub line_total_cents: i64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Receivable (Crediário)
// =============================================================================

/// The status of a receivable record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum ReceivableStatus {
    /// Open balance, may be partially paid.
    Pending,
    /// Fully settled.
    Paid,
}

/// An amount owed to the business by a customer (credit sale not yet paid).
///
/// ## Invariants
/// - `amount_paid_cents <= amount_cents` at all times
/// - status is `Paid` iff `amount_paid_cents >= amount_cents`
///
/// ## Lifecycle
/// Created when a sale is finalized on crediário; mutated only by the
/// payment allocator (or direct administrative correction); never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Receivable {
    pub id: String,
    pub customer_id: String,
    /// Sale that originated this installment.
    pub sale_id: Option<String>,
    /// Total amount owed on this record, in centavos.
    pub amount_cents: i64,
    /// Amount already paid, in centavos. Defaults to zero.
    pub amount_paid_cents: i64,
    pub due_date: NaiveDate,
    pub status: ReceivableStatus,
    /// When the record was fully settled.
    pub paid_at: Option<DateTime<Utc>>,
    /// Operator that received the final payment.
    pub paid_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Receivable {
    /// Remaining balance on this record.
    #[inline]
    pub fn outstanding(&self) -> Money {
        Money::from_cents(self.amount_cents)
            .saturating_sub_to_zero(Money::from_cents(self.amount_paid_cents))
    }

    /// Whether the record is fully settled.
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.amount_paid_cents >= self.amount_cents
    }

    /// Whether the record is past due on `today`.
    #[inline]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == ReceivableStatus::Pending && self.due_date < today
    }
}

// =============================================================================
// Credit Audit Trail
// =============================================================================

/// Action recorded in the credit audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum CreditAction {
    /// A payment was allocated across the customer's receivables.
    Payment,
}

/// Append-only audit entry created once per successful allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CreditAuditEntry {
    pub id: String,
    /// Client-supplied idempotency key; unique per allocation run.
    /// A retried allocation reuses the same id and is deduplicated by the
    /// store's unique index.
    pub allocation_id: String,
    pub customer_id: String,
    pub action: CreditAction,
    /// Aggregate outstanding balance before the allocation.
    pub prior_balance_cents: i64,
    /// Aggregate outstanding balance after the allocation.
    pub new_balance_cents: i64,
    pub note: Option<String>,
    /// Operator that received the payment.
    pub actor_id: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
