use super::*;
use crate::core::Actor;
use crate::db::fixtures::*;
use shared::models::{Household, Inhabitant, Order};
use shared::types::{DinnerMode, OrderAuditAction, OrderState, WeekDay};

/// Saturday 2025-03-01; deadline is 10 days
fn today() -> chrono::NaiveDate {
    date(2025, 3, 1)
}

/// Monday 16 days out (before the deadline)
fn far_monday() -> chrono::NaiveDate {
    date(2025, 3, 17)
}

/// Thursday 5 days out (after the deadline)
fn near_thursday() -> chrono::NaiveDate {
    date(2025, 3, 6)
}

fn engine(community: &Community) -> OrderScaffoldEngine {
    OrderScaffoldEngine::new(community.repo(), test_config())
}

fn season_request(community: &Community) -> ScaffoldRequest {
    ScaffoldRequest::new(community.season.id, HouseholdScope::All, Actor::system()).on(today())
}

fn household_request(community: &Community, household: &Household) -> ScaffoldRequest {
    ScaffoldRequest::new(
        community.season.id,
        HouseholdScope::Households(vec![household.id]),
        Actor::system(),
    )
    .on(today())
}

async fn run(community: &Community) -> ScaffoldResult {
    engine(community).run(&season_request(community)).await.unwrap()
}

fn orders_of(community: &Community, inhabitant: &Inhabitant) -> Vec<Order> {
    community
        .store
        .orders()
        .into_iter()
        .filter(|o| o.inhabitant_id == inhabitant.id)
        .collect()
}

fn history_actions(community: &Community) -> Vec<OrderAuditAction> {
    community.store.history().iter().map(|h| h.action).collect()
}
