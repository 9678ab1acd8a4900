//! Order and Order History Models

use crate::types::{DinnerMode, OrderAuditAction, OrderState, Timestamp};
use serde::{Deserialize, Serialize};

/// Order - one ticket for one inhabitant at one dinner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: i64,
    pub dinner_event_id: i64,
    pub inhabitant_id: i64,
    /// Weak reference, survives user deletion
    pub booked_by_user_id: Option<i64>,
    /// Weak reference, survives price deletion
    pub ticket_price_id: Option<i64>,
    /// Price in øre, frozen at booking
    pub price_at_booking: i64,
    pub dinner_mode: DinnerMode,
    pub state: OrderState,
    #[serde(default)]
    pub is_guest_ticket: bool,
    /// Household the ticket originally belonged to, set when claimed
    pub provenance_household_id: Option<i64>,
    pub released_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Order {
    pub fn is_released(&self) -> bool {
        self.state == OrderState::Released
    }

    pub fn is_booked(&self) -> bool {
        self.state == OrderState::Booked
    }
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderCreate {
    pub dinner_event_id: i64,
    pub inhabitant_id: i64,
    pub booked_by_user_id: Option<i64>,
    pub ticket_price_id: Option<i64>,
    pub price_at_booking: i64,
    pub dinner_mode: DinnerMode,
    #[serde(default)]
    pub is_guest_ticket: bool,
}

/// Update order payload (None = keep)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrderUpdate {
    pub inhabitant_id: Option<i64>,
    pub booked_by_user_id: Option<i64>,
    pub ticket_price_id: Option<i64>,
    pub price_at_booking: Option<i64>,
    pub dinner_mode: Option<DinnerMode>,
    pub state: Option<OrderState>,
    /// Some(None) clears the provenance
    pub provenance_household_id: Option<Option<i64>>,
    /// Some(None) clears the release stamp
    pub released_at: Option<Option<Timestamp>>,
}

impl OrderUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply onto a stored row
    pub fn apply_to(&self, order: &mut Order, now: Timestamp) {
        if let Some(v) = self.inhabitant_id {
            order.inhabitant_id = v;
        }
        if let Some(v) = self.booked_by_user_id {
            order.booked_by_user_id = Some(v);
        }
        if let Some(v) = self.ticket_price_id {
            order.ticket_price_id = Some(v);
        }
        if let Some(v) = self.price_at_booking {
            order.price_at_booking = v;
        }
        if let Some(v) = self.dinner_mode {
            order.dinner_mode = v;
        }
        if let Some(v) = self.state {
            order.state = v;
        }
        if let Some(v) = self.provenance_household_id {
            order.provenance_household_id = v;
        }
        if let Some(v) = self.released_at {
            order.released_at = v;
        }
        order.updated_at = now;
    }
}

/// Order history entry (append-only)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderHistory {
    pub id: i64,
    /// Null once the order row is deleted
    pub order_id: Option<i64>,
    pub inhabitant_id: i64,
    pub dinner_event_id: i64,
    pub action: OrderAuditAction,
    /// None = system
    pub performed_by_user_id: Option<i64>,
    /// Serialized context blob
    pub audit_data: String,
    pub timestamp: Timestamp,
}

/// Append order history payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderHistoryCreate {
    pub order_id: Option<i64>,
    pub inhabitant_id: i64,
    pub dinner_event_id: i64,
    pub action: OrderAuditAction,
    pub performed_by_user_id: Option<i64>,
    pub audit_data: String,
}

impl OrderHistoryCreate {
    /// Entry for a stored order; `context` is serialized as the audit blob
    pub fn for_order(
        order: &Order,
        action: OrderAuditAction,
        performed_by_user_id: Option<i64>,
        context: serde_json::Value,
    ) -> Self {
        Self {
            order_id: Some(order.id),
            inhabitant_id: order.inhabitant_id,
            dinner_event_id: order.dinner_event_id,
            action,
            performed_by_user_id,
            audit_data: context.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_order() -> Order {
        Order {
            id: 1,
            dinner_event_id: 10,
            inhabitant_id: 100,
            booked_by_user_id: None,
            ticket_price_id: Some(5),
            price_at_booking: 4_500,
            dinner_mode: DinnerMode::DineIn,
            state: OrderState::Booked,
            is_guest_ticket: false,
            provenance_household_id: None,
            released_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_release_update_applies_only_given_fields() {
        let mut order = make_order();
        let update = OrderUpdate {
            state: Some(OrderState::Released),
            dinner_mode: Some(DinnerMode::None),
            released_at: Some(Some(42)),
            ..Default::default()
        };
        update.apply_to(&mut order, 99);
        assert!(order.is_released());
        assert_eq!(order.dinner_mode, DinnerMode::None);
        assert_eq!(order.released_at, Some(42));
        assert_eq!(order.price_at_booking, 4_500);
        assert_eq!(order.updated_at, 99);
    }

    #[test]
    fn test_reclaim_clears_release_stamp() {
        let mut order = make_order();
        order.state = OrderState::Released;
        order.released_at = Some(42);
        OrderUpdate {
            state: Some(OrderState::Booked),
            released_at: Some(None),
            ..Default::default()
        }
        .apply_to(&mut order, 100);
        assert!(order.is_booked());
        assert_eq!(order.released_at, None);
    }

    #[test]
    fn test_empty_update() {
        assert!(OrderUpdate::default().is_empty());
        assert!(!OrderUpdate { price_at_booking: Some(0), ..Default::default() }.is_empty());
    }
}
