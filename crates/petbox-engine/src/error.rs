//! # Engine Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Engine Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Core           │  │  Db             │  │  Payment                │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  NotFound       │  │  NotFound       │  │  Declined               │ │
//! │  │  Transition     │  │  Conflict       │  │  Unavailable            │ │
//! │  │  Validation     │  │  QueryFailed    │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Every variant maps to one stable ErrorCode for clients.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use petbox_core::{CoreError, ValidationError};
use petbox_db::DbError;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Failures reported by the payment collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PaymentError {
    /// The charge was refused (card declined, mandate revoked).
    #[error("Payment declined: {0}")]
    Declined(String),

    /// The payment module could not be reached.
    #[error("Payment provider unavailable: {0}")]
    Unavailable(String),
}

/// Service-level error.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Worker plumbing failures (closed channels).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(err))
    }
}

/// Stable, machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource absent, not owned, or no longer mutable
    NotFound,
    /// Input rejected before storage access
    ValidationError,
    /// State changed underneath the request, or transition not allowed
    Conflict,
    /// Payment collaborator refused or failed
    PaymentError,
    /// Storage failure
    DatabaseError,
    /// Anything else
    Internal,
}

impl EngineError {
    /// Classifies the error.
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::Core(err) => match err {
                CoreError::NotFound { .. } => ErrorCode::NotFound,
                CoreError::InvalidTransition { .. } => ErrorCode::Conflict,
                CoreError::EmptySelection(_)
                | CoreError::WrongMode { .. }
                | CoreError::Validation(_) => ErrorCode::ValidationError,
            },
            EngineError::Db(err) => match err {
                DbError::NotFound { .. } => ErrorCode::NotFound,
                DbError::UniqueViolation { .. } | DbError::Conflict(_) => ErrorCode::Conflict,
                DbError::ForeignKeyViolation { .. } => ErrorCode::ValidationError,
                _ => ErrorCode::DatabaseError,
            },
            EngineError::Payment(_) => ErrorCode::PaymentError,
            EngineError::Internal(_) => ErrorCode::Internal,
        }
    }
}
