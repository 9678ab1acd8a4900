//! Unified error codes for the booking engine
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 2xxx: Permission errors
//! - 3xxx: Household / season / calendar errors
//! - 4xxx: Order errors
//! - 5xxx: Billing and import errors
//! - 6xxx: Pricing errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Required field missing
    RequiredField = 7,

    // ==================== 2xxx: Permission ====================
    /// Admin role required
    AdminRequired = 2003,
    /// Caller does not belong to the household
    HouseholdNotOwned = 2006,

    // ==================== 3xxx: Household / Season ====================
    /// Household not found
    HouseholdNotFound = 3001,
    /// Inhabitant not found
    InhabitantNotFound = 3002,
    /// Season not found
    SeasonNotFound = 3101,
    /// Dinner event not found
    DinnerEventNotFound = 3201,
    /// Dinner event is cancelled
    DinnerEventCancelled = 3202,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order is not released (cannot be claimed)
    OrderNotReleased = 4002,
    /// Order is not booked
    OrderNotBooked = 4003,
    /// Inhabitant already holds an order for the dinner
    OrderAlreadyExists = 4004,
    /// Cancellation deadline has passed
    DeadlinePassed = 4005,
    /// Reconciliation stopped part way; counts of completed buckets are attached
    ReconciliationIncomplete = 4010,

    // ==================== 5xxx: Billing ====================
    /// Order snapshot could not be parsed or written
    SnapshotInvalid = 5002,
    /// CSV input is empty
    CsvEmpty = 5101,
    /// CSV structure is malformed
    CsvMalformed = 5102,
    /// CSV contains an unparseable date
    CsvInvalidDate = 5103,
    /// Imported address does not match a household
    ImportAddressUnknown = 5104,
    /// Imported date does not match a dinner event
    ImportDateUnknown = 5105,
    /// Billing period is invalid
    BillingPeriodInvalid = 5201,

    // ==================== 6xxx: Pricing ====================
    /// Price list is empty
    PriceListEmpty = 6002,
    /// Price list spans more than one season
    PriceListMixedSeasons = 6003,
    /// No ticket price could be resolved
    TicketPriceUnresolved = 6004,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Job-run ledger error
    JobLedgerError = 9101,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::RequiredField => "Required field is missing",

            // Permission
            ErrorCode::AdminRequired => "Administrator role is required",
            ErrorCode::HouseholdNotOwned => "Caller does not belong to this household",

            // Household / Season
            ErrorCode::HouseholdNotFound => "Household not found",
            ErrorCode::InhabitantNotFound => "Inhabitant not found",
            ErrorCode::SeasonNotFound => "Season not found",
            ErrorCode::DinnerEventNotFound => "Dinner event not found",
            ErrorCode::DinnerEventCancelled => "Dinner event is cancelled",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderNotReleased => "Order is not released",
            ErrorCode::OrderNotBooked => "Order is not booked",
            ErrorCode::OrderAlreadyExists => "Inhabitant already has an order for this dinner",
            ErrorCode::DeadlinePassed => "Cancellation deadline has passed",
            ErrorCode::ReconciliationIncomplete => "Reconciliation did not complete",

            // Billing
            ErrorCode::SnapshotInvalid => "Order snapshot is invalid",
            ErrorCode::CsvEmpty => "CSV input is empty",
            ErrorCode::CsvMalformed => "CSV structure is malformed",
            ErrorCode::CsvInvalidDate => "CSV contains an invalid date",
            ErrorCode::ImportAddressUnknown => "Imported address does not match a household",
            ErrorCode::ImportDateUnknown => "Imported date does not match a dinner event",
            ErrorCode::BillingPeriodInvalid => "Billing period is invalid",

            // Pricing
            ErrorCode::PriceListEmpty => "Price list is empty",
            ErrorCode::PriceListMixedSeasons => "Price list spans more than one season",
            ErrorCode::TicketPriceUnresolved => "No ticket price could be resolved",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::JobLedgerError => "Job ledger error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            7 => Ok(ErrorCode::RequiredField),

            // Permission
            2003 => Ok(ErrorCode::AdminRequired),
            2006 => Ok(ErrorCode::HouseholdNotOwned),

            // Household / Season
            3001 => Ok(ErrorCode::HouseholdNotFound),
            3002 => Ok(ErrorCode::InhabitantNotFound),
            3101 => Ok(ErrorCode::SeasonNotFound),
            3201 => Ok(ErrorCode::DinnerEventNotFound),
            3202 => Ok(ErrorCode::DinnerEventCancelled),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderNotReleased),
            4003 => Ok(ErrorCode::OrderNotBooked),
            4004 => Ok(ErrorCode::OrderAlreadyExists),
            4005 => Ok(ErrorCode::DeadlinePassed),
            4010 => Ok(ErrorCode::ReconciliationIncomplete),

            // Billing
            5002 => Ok(ErrorCode::SnapshotInvalid),
            5101 => Ok(ErrorCode::CsvEmpty),
            5102 => Ok(ErrorCode::CsvMalformed),
            5103 => Ok(ErrorCode::CsvInvalidDate),
            5104 => Ok(ErrorCode::ImportAddressUnknown),
            5105 => Ok(ErrorCode::ImportDateUnknown),
            5201 => Ok(ErrorCode::BillingPeriodInvalid),

            // Pricing
            6002 => Ok(ErrorCode::PriceListEmpty),
            6003 => Ok(ErrorCode::PriceListMixedSeasons),
            6004 => Ok(ErrorCode::TicketPriceUnresolved),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9101 => Ok(ErrorCode::JobLedgerError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::NotFound.code(), 3);
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::HouseholdNotOwned.code(), 2006);
        assert_eq!(ErrorCode::OrderNotReleased.code(), 4002);
        assert_eq!(ErrorCode::CsvMalformed.code(), 5102);
        assert_eq!(ErrorCode::PriceListMixedSeasons.code(), 6003);
        assert_eq!(ErrorCode::InternalError.code(), 9001);
    }

    #[test]
    fn test_try_from_round_trip() {
        for code in [
            ErrorCode::NotFound,
            ErrorCode::SeasonNotFound,
            ErrorCode::DeadlinePassed,
            ErrorCode::SnapshotInvalid,
            ErrorCode::TicketPriceUnresolved,
            ErrorCode::JobLedgerError,
        ] {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
        assert_eq!(ErrorCode::try_from(4242), Err(InvalidErrorCode(4242)));
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&ErrorCode::OrderNotFound).unwrap();
        assert_eq!(json, "4001");
        let code: ErrorCode = serde_json::from_str("6002").unwrap();
        assert_eq!(code, ErrorCode::PriceListEmpty);
    }
}
