//! # Error Types
//!
//! Domain-specific error types for petbox-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  petbox-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  petbox-db errors                                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  petbox-engine errors                                                  │
//! │  └── EngineError      - Service failures with a stable ErrorCode       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → ApiError → Client   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Entity is absent, not owned by the caller, or no longer mutable.
    ///
    /// ## When This Occurs
    /// - Draft id doesn't exist or belongs to another user
    /// - Draft was already converted (lookups only match `status = draft`)
    /// - Variant doesn't exist or doesn't belong to the product
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Plan status does not allow the requested action.
    ///
    /// ## When This Occurs
    /// - Pausing a paused plan
    /// - Resuming an active plan
    /// - Any action on a cancelled plan
    #[error("Cannot {action} a plan that is {from}")]
    InvalidTransition { from: String, action: String },

    /// Draft has no lines to commit.
    #[error("Draft {0} has no products")]
    EmptySelection(String),

    /// Draft was created for the other conversion path.
    #[error("Draft is in {actual} mode, expected {expected}")]
    WrongMode { expected: String, actual: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any storage access.
#[derive(Debug, Error, PartialEq, Eq)]
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

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::not_found("Draft", "abc");
        assert_eq!(err.to_string(), "Draft not found: abc");

        let err = CoreError::InvalidTransition {
            from: "cancelled".to_string(),
            action: "resume".to_string(),
        };
        assert_eq!(err.to_string(), "Cannot resume a plan that is cancelled");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "budget".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
