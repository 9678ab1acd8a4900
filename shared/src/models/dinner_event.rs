//! Dinner Event Model

use crate::types::DinnerState;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One community dinner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DinnerEvent {
    pub id: i64,
    pub season_id: i64,
    pub date: NaiveDate,
    pub menu_title: String,
    pub menu_description: Option<String>,
    /// Total cost in øre
    pub total_cost: i64,
    pub state: DinnerState,
}
