//! Error handling for the Farm Ledger backend
//!
//! Ledger operations fail synchronously with one of these variants and
//! never leave a partial mutation behind.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Business logic errors
    #[error("Insufficient stock for item {item_id}: available {available}, requested {requested}")]
    InsufficientStock {
        item_id: Uuid,
        available: Decimal,
        requested: Decimal,
    },

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(vec![message.into()])
    }

    /// `Ok(())` for an empty error list, `Validation` otherwise
    pub fn check(errors: Vec<String>) -> AppResult<()> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }

    /// Stable machine-readable code, also used in logs and side-effect reports
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::DuplicateEntry(_) => "DUPLICATE_ENTRY",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            AppError::InvalidStateTransition(_) => "INVALID_STATE_TRANSITION",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl ErrorDetail {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: Vec::new(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, error_detail) = match &self {
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: code.to_string(),
                    message: "Validation failed".to_string(),
                    details: errors.clone(),
                },
            ),
            AppError::DuplicateEntry(what) => (
                StatusCode::CONFLICT,
                ErrorDetail::new(code, format!("{} has already been recorded", what)),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new(code, format!("{} not found", resource)),
            ),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorDetail::new(code, msg.clone())),
            AppError::InsufficientStock { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new(code, self.to_string()),
            ),
            AppError::InvalidStateTransition(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new(code, msg.clone()),
            ),
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(code, format!("Configuration error: {}", msg)),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(code, "A database error occurred"),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new(code, "An internal server error occurred"),
            ),
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!(code, "Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for services and handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_empty_list_is_ok() {
        assert!(AppError::check(Vec::new()).is_ok());
    }

    #[test]
    fn test_check_keeps_messages_verbatim() {
        let err = AppError::check(vec!["Name is required".into(), "Unit is required".into()])
            .unwrap_err();
        match err {
            AppError::Validation(errors) => {
                assert_eq!(errors, vec!["Name is required", "Unit is required"])
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::validation("bad"), StatusCode::BAD_REQUEST),
            (AppError::NotFound("Invoice".into()), StatusCode::NOT_FOUND),
            (AppError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (
                AppError::InsufficientStock {
                    item_id: Uuid::nil(),
                    available: Decimal::from(5),
                    requested: Decimal::from(10),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (AppError::DuplicateEntry("Movement".into()), StatusCode::CONFLICT),
            (AppError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
