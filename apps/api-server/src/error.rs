//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Handler → Result<Json<T>, ApiError>                                   │
//! │                                                                         │
//! │  EngineError ──code()──► ErrorCode ──► HTTP status                     │
//! │                                                                         │
//! │    NOT_FOUND          404      VALIDATION_ERROR   400                  │
//! │    CONFLICT           409      PAYMENT_ERROR      402                  │
//! │    DATABASE_ERROR     500      INTERNAL           500                  │
//! │                                                                         │
//! │  Body: { "code": "NOT_FOUND", "message": "Draft not found: ..." }      │
//! │  Database details are logged, never returned.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use petbox_core::ValidationError;
use petbox_engine::{EngineError, ErrorCode};

/// API error returned from handlers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn status(&self) -> StatusCode {
        match self.code {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::PaymentError => StatusCode::PAYMENT_REQUIRED,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let code = err.code();

        match (&err, code) {
            (EngineError::Db(e), ErrorCode::DatabaseError) => {
                // Log the actual error but return a generic message
                tracing::error!("Database operation failed: {}", e);
                ApiError::new(code, "Database operation failed")
            }
            (EngineError::Db(e), ErrorCode::ValidationError) => {
                tracing::error!("Foreign key violation: {}", e);
                ApiError::new(code, "Invalid reference")
            }
            (EngineError::Internal(e), _) => {
                tracing::error!("Internal error: {}", e);
                ApiError::new(code, "Internal error")
            }
            _ => ApiError::new(code, err.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
