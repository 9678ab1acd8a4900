//! Reconciliation planning
//!
//! Pure and synchronous: given everything the engine loaded, decide per
//! (inhabitant, dinner event) pair which bucket, if any, the pair lands in.
//! Nothing here touches the repository, so a plan can be computed, inspected
//! and dropped without side effects.
//!
//! ```text
//! latest user action == USER_CANCELLED ─────────────▶ skip (sticky)
//! no order,  wants ticket, before deadline ─────────▶ create
//! no order,  wants ticket, after deadline ──────────▶ claim from released pool
//! RELEASED,  wants ticket ──────────────────────────▶ update (reclaim)
//! BOOKED,    wants NONE,   before deadline ─────────▶ delete
//! BOOKED,    wants NONE,   after deadline ──────────▶ release, or claim when a
//!                                                      late wish wants the slot
//! BOOKED,    other mode ────────────────────────────▶ update (mode)
//! BOOKED,    category drifted from stored price ────▶ price-update
//! ```
//!
//! A manual user action (book, claim, mode change) pins existence and mode;
//! only the price-update rule still applies to such a pair.

use chrono::NaiveDate;
use serde_json::json;
use shared::models::{
    DinnerEvent, Inhabitant, Order, OrderCreate, OrderHistory, OrderUpdate, TicketPrice,
};
use shared::types::{DinnerMode, OrderAuditAction, OrderState, TicketType, Timestamp};
use std::collections::{HashMap, HashSet};

use super::result::{Bucket, ScaffoldResult};
use crate::pricing::resolve_for_inhabitant;
use crate::utils::time::is_before_deadline;

/// Everything the planner reads
#[derive(Debug, Clone, Copy)]
pub struct PlanInput<'a> {
    pub season_id: i64,
    /// In-scope events (future, cooking days, not cancelled)
    pub events: &'a [DinnerEvent],
    /// Inhabitants of the in-scope households
    pub inhabitants: &'a [Inhabitant],
    /// Orders held by those inhabitants for those events
    pub orders: &'a [Order],
    /// RELEASED orders of any household for those events
    pub released_pool: &'a [Order],
    /// Inhabitant id → household id for every holder of a pool order
    pub pool_holders: &'a HashMap<i64, i64>,
    /// History of the in-scope (inhabitant, event) pairs
    pub history: &'a [OrderHistory],
    pub prices: &'a [TicketPrice],
    pub today: NaiveDate,
    pub deadline_days: i64,
    pub actor_user_id: Option<i64>,
    pub now: Timestamp,
}

/// Order to create
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCreate {
    pub order: OrderCreate,
    pub context: serde_json::Value,
}

/// Change to an existing order row
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedUpdate {
    pub order_id: i64,
    pub update: OrderUpdate,
    pub action: OrderAuditAction,
    pub context: serde_json::Value,
}

/// Order row to remove
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedDelete {
    pub order: Order,
    pub context: serde_json::Value,
}

/// Full bucketed plan for one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScaffoldPlan {
    pub create: Vec<PlannedCreate>,
    /// Reclaims (`SYSTEM_RECLAIMED`) and mode changes (`SYSTEM_MODE_UPDATED`)
    pub update: Vec<PlannedUpdate>,
    pub claim: Vec<PlannedUpdate>,
    pub release: Vec<PlannedUpdate>,
    pub delete: Vec<PlannedDelete>,
    pub price_update: Vec<PlannedUpdate>,
    pub unchanged: usize,
    pub skipped_cancelled: usize,
    pub unfulfilled: usize,
}

impl ScaffoldPlan {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty()
            && self.update.is_empty()
            && self.claim.is_empty()
            && self.release.is_empty()
            && self.delete.is_empty()
            && self.price_update.is_empty()
    }

    pub fn len(&self, bucket: Bucket) -> usize {
        match bucket {
            Bucket::Create => self.create.len(),
            Bucket::Update => self.update.len(),
            Bucket::Claim => self.claim.len(),
            Bucket::Release => self.release.len(),
            Bucket::Delete => self.delete.len(),
            Bucket::PriceUpdate => self.price_update.len(),
        }
    }

    /// Counts the plan would produce if applied completely
    pub fn expected_result(&self, season_id: i64, households_touched: usize) -> ScaffoldResult {
        let mode_updated = self
            .update
            .iter()
            .filter(|u| u.action == OrderAuditAction::SystemModeUpdated)
            .count();
        ScaffoldResult {
            season_id,
            households_touched,
            created: self.create.len(),
            mode_updated,
            reclaimed: self.update.len() - mode_updated,
            claimed: self.claim.len(),
            released: self.release.len(),
            deleted: self.delete.len(),
            price_updated: self.price_update.len(),
            unchanged: self.unchanged,
            skipped_cancelled: self.skipped_cancelled,
            unfulfilled: self.unfulfilled,
        }
    }
}

/// Latest user-originated action per (inhabitant, event)
fn latest_user_actions(history: &[OrderHistory]) -> HashMap<(i64, i64), OrderAuditAction> {
    let mut rows: Vec<&OrderHistory> = history.iter().filter(|h| h.action.is_user_action()).collect();
    rows.sort_by_key(|h| (h.timestamp, h.id));
    rows.into_iter()
        .map(|h| ((h.inhabitant_id, h.dinner_event_id), h.action))
        .collect()
}

struct ClaimCandidate<'a> {
    inhabitant: &'a Inhabitant,
    event: &'a DinnerEvent,
    mode: DinnerMode,
}

/// Compute the plan
pub fn plan_scaffold(input: &PlanInput<'_>) -> ScaffoldPlan {
    let mut plan = ScaffoldPlan::default();
    let user_actions = latest_user_actions(input.history);

    let mut events: Vec<&DinnerEvent> = input.events.iter().collect();
    events.sort_by_key(|e| (e.date, e.id));
    let mut inhabitants: Vec<&Inhabitant> = input.inhabitants.iter().collect();
    inhabitants.sort_by_key(|i| i.id);

    let mut own_orders: HashMap<(i64, i64), &Order> = HashMap::new();
    for order in input.orders.iter().filter(|o| !o.is_guest_ticket) {
        own_orders
            .entry((order.inhabitant_id, order.dinner_event_id))
            .or_insert(order);
    }

    let mut reclaimed: HashSet<i64> = HashSet::new();
    let mut released_now: Vec<&Order> = Vec::new();
    let mut claim_candidates: Vec<ClaimCandidate<'_>> = Vec::new();

    for event in &events {
        let before_deadline = is_before_deadline(input.today, event.date, input.deadline_days);

        for inhabitant in &inhabitants {
            let desired = inhabitant.preferences().for_date(event.date);
            let key = (inhabitant.id, event.id);
            let latest = user_actions.get(&key).copied();

            if latest == Some(OrderAuditAction::UserCancelled) {
                tracing::debug!(
                    inhabitant_id = inhabitant.id,
                    dinner_event_id = event.id,
                    "Skipping pair with explicit user cancellation"
                );
                plan.skipped_cancelled += 1;
                continue;
            }
            let manual = latest.is_some();

            match own_orders.get(&key) {
                None => {
                    if !desired.is_attending() || manual {
                        plan.unchanged += 1;
                    } else if before_deadline {
                        match plan_create(input, inhabitant, event, desired) {
                            Some(create) => plan.create.push(create),
                            None => plan.unfulfilled += 1,
                        }
                    } else {
                        claim_candidates.push(ClaimCandidate {
                            inhabitant,
                            event,
                            mode: desired,
                        });
                    }
                }
                Some(order) if order.state == OrderState::Released => {
                    if desired.is_attending() && !manual {
                        reclaimed.insert(order.id);
                        plan.update.push(PlannedUpdate {
                            order_id: order.id,
                            update: OrderUpdate {
                                state: Some(OrderState::Booked),
                                dinner_mode: Some(desired),
                                released_at: Some(None),
                                ..Default::default()
                            },
                            action: OrderAuditAction::SystemReclaimed,
                            context: json!({
                                "bucket": Bucket::Update.as_str(),
                                "season_id": input.season_id,
                                "dinner_mode": desired,
                            }),
                        });
                        push_price_update(&mut plan, input, inhabitant, event, order);
                    } else {
                        plan.unchanged += 1;
                    }
                }
                Some(order) => {
                    let mut changed = false;
                    if !manual {
                        if !desired.is_attending() {
                            let bucket = if before_deadline {
                                Bucket::Delete
                            } else {
                                Bucket::Release
                            };
                            tracing::debug!(
                                order_id = order.id,
                                bucket = %bucket,
                                "Preference removed ticket"
                            );
                            if before_deadline {
                                plan.delete.push(PlannedDelete {
                                    order: (*order).clone(),
                                    context: json!({
                                        "bucket": bucket.as_str(),
                                        "season_id": input.season_id,
                                        "previous_mode": order.dinner_mode,
                                    }),
                                });
                            } else {
                                released_now.push(order);
                                plan.release.push(PlannedUpdate {
                                    order_id: order.id,
                                    update: OrderUpdate {
                                        state: Some(OrderState::Released),
                                        dinner_mode: Some(DinnerMode::None),
                                        released_at: Some(Some(input.now)),
                                        ..Default::default()
                                    },
                                    action: OrderAuditAction::SystemReleased,
                                    context: json!({
                                        "bucket": bucket.as_str(),
                                        "season_id": input.season_id,
                                        "previous_mode": order.dinner_mode,
                                    }),
                                });
                            }
                            continue;
                        }
                        if order.dinner_mode != desired {
                            plan.update.push(PlannedUpdate {
                                order_id: order.id,
                                update: OrderUpdate {
                                    dinner_mode: Some(desired),
                                    ..Default::default()
                                },
                                action: OrderAuditAction::SystemModeUpdated,
                                context: json!({
                                    "bucket": Bucket::Update.as_str(),
                                    "season_id": input.season_id,
                                    "previous_mode": order.dinner_mode,
                                    "dinner_mode": desired,
                                }),
                            });
                            changed = true;
                        }
                    }
                    if push_price_update(&mut plan, input, inhabitant, event, order) {
                        changed = true;
                    }
                    if !changed {
                        plan.unchanged += 1;
                    }
                }
            }
        }
    }

    assign_claims(&mut plan, input, claim_candidates, &reclaimed, &released_now);
    plan
}

fn plan_create(
    input: &PlanInput<'_>,
    inhabitant: &Inhabitant,
    event: &DinnerEvent,
    mode: DinnerMode,
) -> Option<PlannedCreate> {
    let Some(price) = resolve_for_inhabitant(inhabitant, input.prices, event.date) else {
        tracing::warn!(
            inhabitant_id = inhabitant.id,
            dinner_event_id = event.id,
            "No ticket price resolved, order not created"
        );
        return None;
    };
    Some(PlannedCreate {
        order: OrderCreate {
            dinner_event_id: event.id,
            inhabitant_id: inhabitant.id,
            booked_by_user_id: input.actor_user_id,
            ticket_price_id: Some(price.id),
            price_at_booking: price.price,
            dinner_mode: mode,
            is_guest_ticket: false,
        },
        context: json!({
            "bucket": Bucket::Create.as_str(),
            "season_id": input.season_id,
            "dinner_mode": mode,
            "ticket_type": price.ticket_type,
            "price_at_booking": price.price,
        }),
    })
}

/// Queue a price update when the resolved category drifted; returns whether one was queued
fn push_price_update(
    plan: &mut ScaffoldPlan,
    input: &PlanInput<'_>,
    inhabitant: &Inhabitant,
    event: &DinnerEvent,
    order: &Order,
) -> bool {
    if order.is_guest_ticket {
        return false;
    }
    let Some(resolved) = resolve_for_inhabitant(inhabitant, input.prices, event.date) else {
        return false;
    };
    let stored_type: Option<TicketType> = order
        .ticket_price_id
        .and_then(|id| input.prices.iter().find(|p| p.id == id))
        .map(|p| p.ticket_type);
    if stored_type == Some(resolved.ticket_type) {
        return false;
    }
    tracing::debug!(
        order_id = order.id,
        from = ?stored_type,
        to = %resolved.ticket_type,
        "Ticket category drifted"
    );
    plan.price_update.push(PlannedUpdate {
        order_id: order.id,
        update: OrderUpdate {
            ticket_price_id: Some(resolved.id),
            price_at_booking: Some(resolved.price),
            ..Default::default()
        },
        action: OrderAuditAction::SystemPriceUpdated,
        context: json!({
            "bucket": Bucket::PriceUpdate.as_str(),
            "season_id": input.season_id,
            "previous_price": order.price_at_booking,
            "previous_ticket_type": stored_type,
            "ticket_type": resolved.ticket_type,
            "price_at_booking": resolved.price,
        }),
    });
    true
}

/// Hand released tickets to late wishers, lowest order id first
///
/// The pool holds tickets already RELEASED plus those this run releases; a
/// ticket released and wanted in the same run moves straight to the wisher
/// and its release is dropped from the plan.
fn assign_claims(
    plan: &mut ScaffoldPlan,
    input: &PlanInput<'_>,
    candidates: Vec<ClaimCandidate<'_>>,
    reclaimed: &HashSet<i64>,
    released_now: &[&Order],
) {
    let mut pool: Vec<&Order> = input
        .released_pool
        .iter()
        .filter(|o| o.state == OrderState::Released && !reclaimed.contains(&o.id))
        .chain(released_now.iter().copied())
        .collect();
    pool.sort_by_key(|o| o.id);
    pool.dedup_by_key(|o| o.id);
    let mut taken: HashSet<i64> = HashSet::new();

    let holder_household = |inhabitant_id: i64| {
        input.pool_holders.get(&inhabitant_id).copied().or_else(|| {
            input
                .inhabitants
                .iter()
                .find(|i| i.id == inhabitant_id)
                .map(|i| i.household_id)
        })
    };

    for candidate in candidates {
        let ClaimCandidate {
            inhabitant,
            event,
            mode,
        } = candidate;

        let Some(order) = pool.iter().copied().find(|o| {
            o.dinner_event_id == event.id
                && o.inhabitant_id != inhabitant.id
                && !taken.contains(&o.id)
        }) else {
            plan.unfulfilled += 1;
            continue;
        };
        let Some(price) = resolve_for_inhabitant(inhabitant, input.prices, event.date) else {
            tracing::warn!(
                inhabitant_id = inhabitant.id,
                dinner_event_id = event.id,
                "No ticket price resolved, released ticket not claimed"
            );
            plan.unfulfilled += 1;
            continue;
        };
        taken.insert(order.id);
        if order.state == OrderState::Booked {
            plan.release.retain(|u| u.order_id != order.id);
        }

        let provenance =
            holder_household(order.inhabitant_id).filter(|h| *h != inhabitant.household_id);
        tracing::debug!(
            order_id = order.id,
            inhabitant_id = inhabitant.id,
            provenance_household_id = ?provenance,
            "Claiming released ticket"
        );
        plan.claim.push(PlannedUpdate {
            order_id: order.id,
            update: OrderUpdate {
                inhabitant_id: Some(inhabitant.id),
                booked_by_user_id: input.actor_user_id,
                ticket_price_id: Some(price.id),
                price_at_booking: Some(price.price),
                dinner_mode: Some(mode),
                state: Some(OrderState::Booked),
                provenance_household_id: Some(provenance),
                released_at: Some(None),
            },
            action: OrderAuditAction::SystemClaimed,
            context: json!({
                "bucket": Bucket::Claim.as_str(),
                "season_id": input.season_id,
                "previous_inhabitant_id": order.inhabitant_id,
                "previous_state": order.state,
                "provenance_household_id": provenance,
                "dinner_mode": mode,
                "ticket_type": price.ticket_type,
                "price_at_booking": price.price,
            }),
        });
    }
}
