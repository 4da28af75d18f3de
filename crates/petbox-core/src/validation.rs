//! # Validation Module
//!
//! Input validation for Petbox operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP (axum extractors)                                       │
//! │  └── Type validation (deserialization)                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: petbox-engine services                                       │
//! │  └── THIS MODULE: runs before any storage access                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints (quantity >= 1, billing day 1-28)               │
//! │  ├── UNIQUE (draft_id, product_id, variant_id)                         │
//! │  └── Foreign keys with ON DELETE CASCADE                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use petbox_core::validation::{validate_budget, validate_quantity};
//!
//! validate_budget(200_000).unwrap();
//! validate_quantity(2).unwrap();
//! ```

use crate::error::ValidationError;
use crate::{MAX_BILLING_CYCLE_DAY, MAX_LINE_QUANTITY, MIN_BILLING_CYCLE_DAY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest opaque reference (address id, payment method) accepted.
pub const MAX_REFERENCE_LEN: usize = 128;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a draft budget in minor units.
///
/// ## Rules
/// - Must be positive (> 0)
///
/// ## Example
/// ```rust
/// use petbox_core::validation::validate_budget;
///
/// assert!(validate_budget(200_000).is_ok());
/// assert!(validate_budget(0).is_err());
/// ```
pub fn validate_budget(minor: i64) -> ValidationResult<()> {
    if minor <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "budget".to_string(),
        });
    }

    Ok(())
}

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Draft: Add Product                                                     │
/// │                                                                         │
/// │  validate_quantity(qty) ← THIS FUNCTION                                │
/// │       │                                                                 │
/// │       ├── qty <= 0?  → Error: "quantity must be positive"              │
/// │       ├── qty > 999? → Error: "quantity must be between 1 and 999"     │
/// │       └── OK → upsert-with-increment                                   │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates the day of month a plan bills on (1-28).
pub fn validate_billing_cycle_day(day: u32) -> ValidationResult<()> {
    if !(MIN_BILLING_CYCLE_DAY..=MAX_BILLING_CYCLE_DAY).contains(&day) {
        return Err(ValidationError::OutOfRange {
            field: "billingCycleDay".to_string(),
            min: MIN_BILLING_CYCLE_DAY as i64,
            max: MAX_BILLING_CYCLE_DAY as i64,
        });
    }

    Ok(())
}

/// Validates a discount rate in basis points (0-10000).
pub fn validate_discount_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates an opaque reference owned by another module
/// (address id, payment method, user id).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most MAX_REFERENCE_LEN characters
///
/// ## Returns
/// The trimmed reference.
pub fn validate_reference(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > MAX_REFERENCE_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_REFERENCE_LEN,
        });
    }

    Ok(value.to_string())
}

/// Splits a comma-separated category list, dropping blanks.
///
/// ## Example
/// ```rust
/// use petbox_core::validation::parse_categories;
///
/// assert_eq!(parse_categories("food, toys,,"), vec!["food", "toys"]);
/// assert!(parse_categories("  ").is_empty());
/// ```
pub fn parse_categories(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
