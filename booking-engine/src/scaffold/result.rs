//! Reconciliation result

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mutation buckets, in application order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Create,
    /// Reclaims and mode updates
    Update,
    Claim,
    Release,
    Delete,
    PriceUpdate,
}

impl Bucket {
    pub const APPLY_ORDER: [Bucket; 6] = [
        Bucket::Create,
        Bucket::Update,
        Bucket::Claim,
        Bucket::Release,
        Bucket::Delete,
        Bucket::PriceUpdate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Create => "create",
            Bucket::Update => "update",
            Bucket::Claim => "claim",
            Bucket::Release => "release",
            Bucket::Delete => "delete",
            Bucket::PriceUpdate => "price_update",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts per bucket plus diagnostics
///
/// On a partial failure this holds what completed before the failing batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaffoldResult {
    pub season_id: i64,
    pub households_touched: usize,
    pub created: usize,
    pub mode_updated: usize,
    /// Own released orders restored to BOOKED (part of the update bucket)
    pub reclaimed: usize,
    pub claimed: usize,
    pub released: usize,
    pub deleted: usize,
    pub price_updated: usize,
    /// Pairs already matching their preference
    #[serde(default)]
    pub unchanged: usize,
    /// Pairs skipped because the user cancelled explicitly
    #[serde(default)]
    pub skipped_cancelled: usize,
    /// Wanted tickets with no released order to claim after the deadline
    #[serde(default)]
    pub unfulfilled: usize,
}

impl ScaffoldResult {
    pub fn new(season_id: i64, households_touched: usize) -> Self {
        Self {
            season_id,
            households_touched,
            ..Default::default()
        }
    }

    /// Sum of every mutation bucket
    pub fn total_changes(&self) -> usize {
        self.created
            + self.mode_updated
            + self.reclaimed
            + self.claimed
            + self.released
            + self.deleted
            + self.price_updated
    }

    pub fn is_noop(&self) -> bool {
        self.total_changes() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_serializes_camel_case() {
        let mut result = ScaffoldResult::new(3, 2);
        result.mode_updated = 1;
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["seasonId"], 3);
        assert_eq!(json["householdsTouched"], 2);
        assert_eq!(json["modeUpdated"], 1);
        assert!(!result.is_noop());
        assert!(ScaffoldResult::new(3, 2).is_noop());
    }
}
