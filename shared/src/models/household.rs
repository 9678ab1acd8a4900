//! Household and Inhabitant Models

use super::preferences::DinnerPreferences;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Household (one billing unit)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Household {
    pub id: i64,
    /// External community-platform id
    pub heynabo_id: Option<i64>,
    /// Payment-service customer number, frozen onto invoices
    pub pbs_id: i64,
    pub name: String,
    pub address: String,
}

/// Inhabitant (person eating dinners)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Inhabitant {
    pub id: i64,
    pub household_id: i64,
    pub heynabo_id: Option<i64>,
    pub name: String,
    pub last_name: String,
    /// Drives the default ticket category
    pub birth_date: Option<NaiveDate>,
    /// None = no standing preferences (every weekday NONE)
    #[serde(default)]
    pub dinner_preferences: Option<DinnerPreferences>,
    /// Linked login, if the inhabitant has one
    pub user_id: Option<i64>,
}

impl Inhabitant {
    pub fn full_name(&self) -> String {
        if self.last_name.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, self.last_name)
        }
    }

    /// Standing preferences, all NONE when unset
    pub fn preferences(&self) -> DinnerPreferences {
        self.dinner_preferences.unwrap_or_default()
    }
}
