//! Application error type

use super::category::ErrorCategory;
use super::codes::ErrorCode;
use http::StatusCode;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Application error with structured error code and details
///
/// Every public operation of the engine returns this type at its boundary.
/// `details` carries per-field validation messages, offending line numbers
/// for imports, and completed-bucket counts for interrupted reconciliations.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (field-level errors, context, etc.)
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Look up a detail entry
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.as_ref().and_then(|d| d.get(key))
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// True for failures caused by the caller (validation, missing data, conflicts)
    pub fn is_client_error(&self) -> bool {
        self.http_status().is_client_error()
    }

    // ==================== Convenience constructors ====================

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::DatabaseError, msg)
    }

    pub fn household_not_found(household_id: i64) -> Self {
        Self::with_message(
            ErrorCode::HouseholdNotFound,
            format!("Household {} not found", household_id),
        )
        .with_detail("household_id", household_id)
    }

    pub fn season_not_found(season_id: i64) -> Self {
        Self::with_message(
            ErrorCode::SeasonNotFound,
            format!("Season {} not found", season_id),
        )
        .with_detail("season_id", season_id)
    }

    pub fn order_not_found(order_id: i64) -> Self {
        Self::with_message(
            ErrorCode::OrderNotFound,
            format!("Order {} not found", order_id),
        )
        .with_detail("order_id", order_id)
    }

    pub fn dinner_event_not_found(dinner_event_id: i64) -> Self {
        Self::with_message(
            ErrorCode::DinnerEventNotFound,
            format!("Dinner event {} not found", dinner_event_id),
        )
        .with_detail("dinner_event_id", dinner_event_id)
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
