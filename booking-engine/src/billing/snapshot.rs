//! Billing snapshot serializer
//!
//! `serialize_order` freezes the billing-relevant facts of an order when its
//! transaction is created. `display_transaction` reads a transaction back and
//! decides each field on its own:
//!
//! | Field | Live source | Fallback |
//! |-------|-------------|----------|
//! | household identity | order → inhabitant → household | `inhabitant.household` |
//! | ticket category | order → ticket price | `ticketType` |
//! | guest flag | order | `isGuestTicket` |
//! | provenance | order → provenance household | `provenanceHousehold` |
//!
//! A live order with a deleted price row therefore shows live household data
//! next to the snapshot category.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared::models::{DinnerEvent, Household, Inhabitant, Order, TicketPrice, Transaction};
use shared::order::{DinnerEventSnapshot, HouseholdSnapshot, InhabitantSnapshot, OrderSnapshot};
use shared::types::{TicketType, Timestamp};
use thiserror::Error;

use crate::db::TransactionRelations;
use crate::utils::{AppError, ErrorCode};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Snapshot of transaction {transaction_id} is unreadable: {source}")]
    Parse {
        transaction_id: i64,
        #[source]
        source: serde_json::Error,
    },

    #[error("Snapshot of order {order_id} could not be written: {source}")]
    Serialize {
        order_id: i64,
        #[source]
        source: serde_json::Error,
    },
}

impl From<SnapshotError> for AppError {
    fn from(err: SnapshotError) -> Self {
        let message = err.to_string();
        match err {
            SnapshotError::Parse { transaction_id, .. } => {
                AppError::with_message(ErrorCode::SnapshotInvalid, message)
                    .with_detail("transaction_id", transaction_id)
            }
            SnapshotError::Serialize { order_id, .. } => {
                AppError::with_message(ErrorCode::InternalError, message)
                    .with_detail("order_id", order_id)
            }
        }
    }
}

/// Where a displayed field came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldSource {
    Live,
    Snapshot,
}

fn household_snapshot(household: &Household) -> HouseholdSnapshot {
    HouseholdSnapshot {
        id: household.id,
        pbs_id: household.pbs_id,
        address: household.address.clone(),
    }
}

fn event_snapshot(event: &DinnerEvent) -> DinnerEventSnapshot {
    DinnerEventSnapshot {
        id: event.id,
        date: event.date,
        menu_title: event.menu_title.clone(),
    }
}

/// Freeze one order; pure, no I/O
pub fn serialize_order(
    order: &Order,
    event: &DinnerEvent,
    inhabitant: &Inhabitant,
    household: &Household,
    price: Option<&TicketPrice>,
    provenance: Option<&Household>,
) -> Result<String, SnapshotError> {
    OrderSnapshot {
        dinner_event: event_snapshot(event),
        inhabitant: InhabitantSnapshot {
            id: inhabitant.id,
            name: inhabitant.full_name(),
            household: household_snapshot(household),
        },
        ticket_type: price.map(|p| p.ticket_type),
        is_guest_ticket: order.is_guest_ticket.then_some(true),
        provenance_household: provenance.map(household_snapshot),
    }
    .to_json()
    .map_err(|source| SnapshotError::Serialize {
        order_id: order.id,
        source,
    })
}

pub fn parse_snapshot(transaction: &Transaction) -> Result<OrderSnapshot, SnapshotError> {
    OrderSnapshot::from_json(&transaction.order_snapshot).map_err(|source| SnapshotError::Parse {
        transaction_id: transaction.id,
        source,
    })
}

/// Provenance of each fallback-resolved field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSources {
    pub household: FieldSource,
    pub ticket_type: FieldSource,
    pub is_guest_ticket: FieldSource,
    pub provenance: FieldSource,
}

/// Display-ready transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayTransaction {
    pub transaction_id: i64,
    pub order_id: Option<i64>,
    pub amount: i64,
    pub created_at: Timestamp,
    pub dinner_event: DinnerEventSnapshot,
    pub inhabitant_id: i64,
    pub inhabitant_name: String,
    pub household: HouseholdSnapshot,
    /// None only when neither the live price nor the snapshot knows it
    pub ticket_type: Option<TicketType>,
    pub is_guest_ticket: bool,
    pub provenance_household: Option<HouseholdSnapshot>,
    pub sources: FieldSources,
    /// The raw snapshot, for auditing
    pub snapshot: OrderSnapshot,
}

impl DisplayTransaction {
    pub fn dinner_date(&self) -> NaiveDate {
        self.dinner_event.date
    }
}

fn pick<T>(live: Option<T>, snapshot: impl FnOnce() -> T) -> (T, FieldSource) {
    match live {
        Some(value) => (value, FieldSource::Live),
        None => (snapshot(), FieldSource::Snapshot),
    }
}

/// Rebuild a transaction for display, field by field
pub fn display_transaction(
    transaction: &Transaction,
    relations: &TransactionRelations,
) -> Result<DisplayTransaction, SnapshotError> {
    let snapshot = parse_snapshot(transaction)?;
    let order = transaction
        .order_id
        .and_then(|id| relations.orders.get(&id));
    let inhabitant = order.and_then(|o| relations.inhabitants.get(&o.inhabitant_id));

    let (household, household_source) = pick(
        inhabitant
            .and_then(|i| relations.households.get(&i.household_id))
            .map(household_snapshot),
        || snapshot.household().clone(),
    );
    let (ticket_type, ticket_source) = pick(
        order
            .and_then(|o| o.ticket_price_id)
            .and_then(|id| relations.prices.get(&id))
            .map(|p| Some(p.ticket_type)),
        || snapshot.ticket_type,
    );
    let (is_guest_ticket, guest_source) = pick(order.map(|o| o.is_guest_ticket), || {
        snapshot.is_guest_ticket.unwrap_or(false)
    });
    let (provenance_household, provenance_source) = pick(
        order
            .and_then(|o| o.provenance_household_id)
            .and_then(|id| relations.households.get(&id))
            .map(|h| Some(household_snapshot(h))),
        || snapshot.provenance_household.clone(),
    );
    let dinner_event = order
        .and_then(|o| relations.dinner_events.get(&o.dinner_event_id))
        .map(event_snapshot)
        .unwrap_or_else(|| snapshot.dinner_event.clone());
    let (inhabitant_id, inhabitant_name) = inhabitant
        .map(|i| (i.id, i.full_name()))
        .unwrap_or_else(|| (snapshot.inhabitant.id, snapshot.inhabitant.name.clone()));

    if order.is_some() && household_source == FieldSource::Snapshot {
        tracing::warn!(
            transaction_id = transaction.id,
            order_id = ?transaction.order_id,
            "Live household missing, using snapshot"
        );
    }

    Ok(DisplayTransaction {
        transaction_id: transaction.id,
        order_id: transaction.order_id,
        amount: transaction.amount,
        created_at: transaction.created_at,
        dinner_event,
        inhabitant_id,
        inhabitant_name,
        household,
        ticket_type,
        is_guest_ticket,
        provenance_household,
        sources: FieldSources {
            household: household_source,
            ticket_type: ticket_source,
            is_guest_ticket: guest_source,
            provenance: provenance_source,
        },
        snapshot,
    })
}

/// Display a batch; unreadable snapshots are logged and left out
pub fn display_transactions(
    transactions: &[Transaction],
    relations: &TransactionRelations,
) -> Vec<DisplayTransaction> {
    transactions
        .iter()
        .filter_map(|tx| match display_transaction(tx, relations) {
            Ok(display) => Some(display),
            Err(e) => {
                tracing::warn!(transaction_id = tx.id, error = %e, "Skipping transaction");
                None
            }
        })
        .collect()
}
