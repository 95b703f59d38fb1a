//! # Validation Module
//!
//! Input validation utilities for Fiado POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler (deserialization + THIS MODULE)                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Business rules (allocator preconditions, cart limits)        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (NOT NULL, UNIQUE, FK, CHECK constraints)           │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::{MAX_INSTALLMENTS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use fiado_core::validation::validate_sku;
///
/// assert!(validate_sku("CAFE-500").is_ok());
/// assert!(validate_sku("").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product or customer name.
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a CPF/CNPJ document string.
///
/// ## Rules
/// - Optional (empty is fine at the caller's discretion)
/// - Digits only, 11 (CPF) or 14 (CNPJ) of them
pub fn validate_document(document: &str) -> ValidationResult<()> {
    let document = document.trim();

    if !document.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "document".to_string(),
            reason: "must contain only digits".to_string(),
        });
    }

    if document.len() != 11 && document.len() != 14 {
        return Err(ValidationError::InvalidFormat {
            field: "document".to_string(),
            reason: "must be 11 (CPF) or 14 (CNPJ) digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a search query.
///
/// Can be empty (returns default results); maximum 100 characters.
/// Returns the trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// Must be positive and not exceed MAX_ITEM_QUANTITY.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in centavos.
///
/// Zero is allowed (promotional items); negatives are not.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a payment amount in centavos.
///
/// Must be strictly positive; the allocator re-checks this as its own
/// precondition so the error surfaces even for callers that skip the
/// handler layer.
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    Ok(())
}

/// Validates an installment due date.
///
/// Today is acceptable (pay-on-pickup); anything earlier would create a
/// record that is overdue the moment it exists.
pub fn validate_due_date(due: chrono::NaiveDate, today: chrono::NaiveDate) -> ValidationResult<()> {
    if due < today {
        return Err(ValidationError::InvalidFormat {
            field: "due_date".to_string(),
            reason: "must not be in the past".to_string(),
        });
    }

    Ok(())
}

/// Validates a crediário installment count.
pub fn validate_installments(count: u32) -> ValidationResult<()> {
    if count == 0 || count as i64 > MAX_INSTALLMENTS {
        return Err(ValidationError::OutOfRange {
            field: "installments".to_string(),
            min: 1,
            max: MAX_INSTALLMENTS,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("CAFE-500").is_ok());
        assert!(validate_sku("ABC123").is_ok());
        assert!(validate_sku("produto_1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Café Torrado 500g").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_document() {
        assert!(validate_document("12345678901").is_ok()); // CPF
        assert!(validate_document("12345678000199").is_ok()); // CNPJ
        assert!(validate_document("123.456.789-01").is_err());
        assert!(validate_document("12345").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price_cents() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(1099).is_ok());
        assert!(validate_price_cents(-100).is_err());
    }

    #[test]
    fn test_validate_payment_amount() {
        assert!(validate_payment_amount(1).is_ok());
        assert!(validate_payment_amount(0).is_err());
        assert!(validate_payment_amount(-500).is_err());
    }

    #[test]
    fn test_validate_due_date() {
        let today: chrono::NaiveDate = "2024-06-15".parse().unwrap();
        assert!(validate_due_date(today, today).is_ok());
        assert!(validate_due_date("2024-07-15".parse().unwrap(), today).is_ok());
        assert!(validate_due_date("2024-06-14".parse().unwrap(), today).is_err());
    }

    #[test]
    fn test_validate_installments() {
        assert!(validate_installments(1).is_ok());
        assert!(validate_installments(12).is_ok());
        assert!(validate_installments(0).is_err());
        assert!(validate_installments(50).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}
