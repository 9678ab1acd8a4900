//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// - 0xxx: General errors
/// - 1xxx-2xxx: Permission errors
/// - 3xxx: Household / season errors
/// - 4xxx: Order errors
/// - 5xxx: Billing errors
/// - 6xxx: Pricing errors
/// - 9xxx: System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Permission errors (1xxx-2xxx)
    Permission,
    /// Household, season and calendar errors (3xxx)
    Household,
    /// Order errors (4xxx)
    Order,
    /// Billing and import errors (5xxx)
    Billing,
    /// Pricing errors (6xxx)
    Pricing,
    /// System errors (9xxx)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..3000 => Self::Permission,
            3000..4000 => Self::Household,
            4000..5000 => Self::Order,
            5000..6000 => Self::Billing,
            6000..7000 => Self::Pricing,
            _ => Self::System,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Permission => "permission",
            Self::Household => "household",
            Self::Order => "order",
            Self::Billing => "billing",
            Self::Pricing => "pricing",
            Self::System => "system",
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_code() {
        assert_eq!(ErrorCategory::from_code(0), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(999), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(2001), ErrorCategory::Permission);
        assert_eq!(ErrorCategory::from_code(3101), ErrorCategory::Household);
        assert_eq!(ErrorCategory::from_code(4001), ErrorCategory::Order);
        assert_eq!(ErrorCategory::from_code(5102), ErrorCategory::Billing);
        assert_eq!(ErrorCategory::from_code(6002), ErrorCategory::Pricing);
        assert_eq!(ErrorCategory::from_code(9001), ErrorCategory::System);
        assert_eq!(ErrorCategory::from_code(10000), ErrorCategory::System);
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::NotFound.category(), ErrorCategory::General);
        assert_eq!(
            ErrorCode::HouseholdNotOwned.category(),
            ErrorCategory::Permission
        );
        assert_eq!(ErrorCode::SeasonNotFound.category(), ErrorCategory::Household);
        assert_eq!(ErrorCode::OrderNotReleased.category(), ErrorCategory::Order);
        assert_eq!(ErrorCode::CsvEmpty.category(), ErrorCategory::Billing);
        assert_eq!(ErrorCode::PriceListEmpty.category(), ErrorCategory::Pricing);
        assert_eq!(ErrorCode::DatabaseError.category(), ErrorCategory::System);
    }

    #[test]
    fn test_category_serialize() {
        let json = serde_json::to_string(&ErrorCategory::Billing).unwrap();
        assert_eq!(json, "\"billing\"");
        let category: ErrorCategory = serde_json::from_str("\"pricing\"").unwrap();
        assert_eq!(category, ErrorCategory::Pricing);
    }
}
