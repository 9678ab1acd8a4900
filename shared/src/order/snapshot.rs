//! Frozen billing projection of an order
//!
//! Written once, when the transaction is created, and stored as a JSON string
//! on the transaction. Field names are camelCase on the wire. Every field that
//! older rows may lack is optional so historical snapshots keep parsing.

use crate::types::TicketType;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Household identity as billed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdSnapshot {
    pub id: i64,
    pub pbs_id: i64,
    pub address: String,
}

/// Inhabitant as billed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InhabitantSnapshot {
    pub id: i64,
    pub name: String,
    pub household: HouseholdSnapshot,
}

/// Dinner event as billed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DinnerEventSnapshot {
    pub id: i64,
    pub date: NaiveDate,
    pub menu_title: String,
}

/// Order snapshot stored on a transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderSnapshot {
    pub dinner_event: DinnerEventSnapshot,
    pub inhabitant: InhabitantSnapshot,
    /// None when the ticket price was already gone at billing time
    #[serde(default)]
    pub ticket_type: Option<TicketType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_guest_ticket: Option<bool>,
    /// Original household of a claimed ticket
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance_household: Option<HouseholdSnapshot>,
}

impl OrderSnapshot {
    pub fn household(&self) -> &HouseholdSnapshot {
        &self.inhabitant.household
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
