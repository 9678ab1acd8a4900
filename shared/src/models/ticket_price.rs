//! Ticket Price Model

use crate::types::TicketType;
use serde::{Deserialize, Serialize};

/// One row of a season's price list
///
/// Several rows may share a ticket type (price tiers).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TicketPrice {
    pub id: i64,
    pub season_id: i64,
    pub ticket_type: TicketType,
    /// Price in øre
    pub price: i64,
    pub description: Option<String>,
    /// Exclusive upper age bound; None = unbounded
    pub maximum_age_limit: Option<u32>,
}
