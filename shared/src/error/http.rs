//! HTTP status code mapping for error codes

use super::category::ErrorCategory;
use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // 404 Not Found
            Self::NotFound
            | Self::HouseholdNotFound
            | Self::InhabitantNotFound
            | Self::SeasonNotFound
            | Self::DinnerEventNotFound
            | Self::OrderNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::AlreadyExists
            | Self::OrderNotReleased
            | Self::OrderNotBooked
            | Self::OrderAlreadyExists
            | Self::DeadlinePassed
            | Self::DinnerEventCancelled => StatusCode::CONFLICT,

            // 403 Forbidden
            Self::AdminRequired | Self::HouseholdNotOwned => StatusCode::FORBIDDEN,

            // 500 Internal Server Error
            Self::ReconciliationIncomplete => StatusCode::INTERNAL_SERVER_ERROR,
            code if code.category() == ErrorCategory::System => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (default for validation/business errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
