//! Single-order user actions
//!
//! Every action appends a `USER_*` history row. Reconciliation reads those rows
//! back: a latest `USER_CANCELLED` makes the pair sticky, any other user action
//! pins the order's existence and mode.

use chrono::NaiveDate;
use serde_json::json;
use shared::models::{
    DinnerEvent, Inhabitant, Order, OrderCreate, OrderUpdate, Season, TicketPrice,
};
use shared::types::{DinnerMode, OrderAuditAction, OrderState};
use shared::util::now_millis;
use std::sync::Arc;

use crate::core::{Actor, Config};
use crate::db::{AuditedOrderWrite, BookingRepository, OrderWrite};
use crate::pricing::resolve_for_inhabitant;
use crate::utils::time::{cancellation_cutoff, is_before_deadline};
use crate::utils::validation::validate_price_list;
use crate::utils::{AppError, AppResult, ErrorCode};

/// What a cancellation did to the row
#[derive(Debug, Clone, PartialEq)]
pub enum CancelOutcome {
    /// Before the deadline: the row is gone
    Deleted { order_id: i64 },
    /// At or after the deadline: the ticket is up for grabs
    Released(Order),
}

/// User-initiated booking operations
pub struct OrderActions {
    repo: Arc<dyn BookingRepository>,
    config: Config,
    today: Option<NaiveDate>,
}

impl OrderActions {
    pub fn new(repo: Arc<dyn BookingRepository>, config: Config) -> Self {
        Self {
            repo,
            config,
            today: None,
        }
    }

    /// Pin "today" instead of reading the clock
    pub fn on(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| self.config.today())
    }

    /// Book a ticket before the deadline
    pub async fn book_order(
        &self,
        actor: &Actor,
        inhabitant_id: i64,
        dinner_event_id: i64,
        mode: DinnerMode,
    ) -> AppResult<Order> {
        require_attending(mode)?;
        let inhabitant = self.inhabitant(inhabitant_id).await?;
        actor.ensure_can_act_for(inhabitant.household_id)?;
        let event = self.open_event(dinner_event_id).await?;
        let season = self.season(event.season_id).await?;

        let days = self.deadline_days(&season);
        if !is_before_deadline(self.today(), event.date, days) {
            return Err(AppError::with_message(
                ErrorCode::DeadlinePassed,
                "Booking deadline has passed, claim a released ticket instead",
            )
            .with_detail("dinner_event_id", event.id)
            .with_detail("cutoff", cancellation_cutoff(event.date, days).to_string()));
        }

        let existing = self
            .repo
            .find_orders_by_household_and_events(&[inhabitant.household_id], &[event.id])
            .await?;
        if let Some(order) = existing
            .iter()
            .find(|o| o.inhabitant_id == inhabitant.id && !o.is_guest_ticket)
        {
            return Err(AppError::new(ErrorCode::OrderAlreadyExists)
                .with_detail("order_id", order.id));
        }

        let prices = self.prices(&season).await?;
        let price = resolve_price(&inhabitant, &prices, &event)?;

        let order = self
            .write(
                OrderWrite::Create(OrderCreate {
                    dinner_event_id: event.id,
                    inhabitant_id: inhabitant.id,
                    booked_by_user_id: actor.user_id,
                    ticket_price_id: Some(price.id),
                    price_at_booking: price.price,
                    dinner_mode: mode,
                    is_guest_ticket: false,
                }),
                OrderAuditAction::UserBooked,
                actor,
                json!({
                    "dinner_mode": mode,
                    "ticket_type": price.ticket_type,
                    "price_at_booking": price.price,
                }),
            )
            .await?;

        tracing::info!(
            order_id = order.id,
            inhabitant_id = inhabitant.id,
            dinner_event_id = event.id,
            "Order booked"
        );
        Ok(order)
    }

    /// Cancel: delete before the deadline, release at or after it
    pub async fn cancel_order(&self, actor: &Actor, order_id: i64) -> AppResult<CancelOutcome> {
        let order = self.order(order_id).await?;
        let holder = self.inhabitant(order.inhabitant_id).await?;
        actor.ensure_can_act_for(holder.household_id)?;
        if order.state != OrderState::Booked {
            return Err(AppError::new(ErrorCode::OrderNotBooked).with_detail("order_id", order.id));
        }
        let event = self.event(order.dinner_event_id).await?;
        let season = self.season(event.season_id).await?;

        if is_before_deadline(self.today(), event.date, self.deadline_days(&season)) {
            self.write(
                OrderWrite::Delete(order.clone()),
                OrderAuditAction::UserCancelled,
                actor,
                json!({ "outcome": "deleted", "previous_mode": order.dinner_mode }),
            )
            .await?;
            tracing::info!(order_id = order.id, "Order cancelled and deleted");
            return Ok(CancelOutcome::Deleted { order_id: order.id });
        }

        let released = self
            .write(
                OrderWrite::Update {
                    id: order.id,
                    data: OrderUpdate {
                        state: Some(OrderState::Released),
                        dinner_mode: Some(DinnerMode::None),
                        released_at: Some(Some(now_millis())),
                        ..Default::default()
                    },
                },
                OrderAuditAction::UserCancelled,
                actor,
                json!({ "outcome": "released", "previous_mode": order.dinner_mode }),
            )
            .await?;
        tracing::info!(order_id = order.id, "Order cancelled after deadline, ticket released");
        Ok(CancelOutcome::Released(released))
    }

    /// Take over a released ticket
    pub async fn claim_order(
        &self,
        actor: &Actor,
        order_id: i64,
        inhabitant_id: i64,
        mode: DinnerMode,
    ) -> AppResult<Order> {
        require_attending(mode)?;
        let order = self.order(order_id).await?;
        if order.state != OrderState::Released {
            return Err(AppError::new(ErrorCode::OrderNotReleased).with_detail("order_id", order.id));
        }
        let claimant = self.inhabitant(inhabitant_id).await?;
        actor.ensure_can_act_for(claimant.household_id)?;
        let event = self.open_event(order.dinner_event_id).await?;

        if claimant.id != order.inhabitant_id {
            let existing = self
                .repo
                .find_orders_by_household_and_events(&[claimant.household_id], &[event.id])
                .await?;
            if let Some(own) = existing
                .iter()
                .find(|o| o.inhabitant_id == claimant.id && !o.is_guest_ticket)
            {
                return Err(AppError::new(ErrorCode::OrderAlreadyExists)
                    .with_detail("order_id", own.id));
            }
        }

        // previous holder may have been deleted since the release
        let provenance = self
            .repo
            .find_inhabitants(&[order.inhabitant_id])
            .await?
            .first()
            .map(|i| i.household_id)
            .filter(|household_id| *household_id != claimant.household_id);

        let season = self.season(event.season_id).await?;
        let prices = self.prices(&season).await?;
        let price = resolve_price(&claimant, &prices, &event)?;

        let claimed = self
            .write(
                OrderWrite::Update {
                    id: order.id,
                    data: OrderUpdate {
                        inhabitant_id: Some(claimant.id),
                        booked_by_user_id: actor.user_id,
                        ticket_price_id: Some(price.id),
                        price_at_booking: Some(price.price),
                        dinner_mode: Some(mode),
                        state: Some(OrderState::Booked),
                        provenance_household_id: Some(provenance),
                        released_at: Some(None),
                    },
                },
                OrderAuditAction::UserClaimed,
                actor,
                json!({
                    "previous_inhabitant_id": order.inhabitant_id,
                    "provenance_household_id": provenance,
                    "ticket_type": price.ticket_type,
                    "price_at_booking": price.price,
                }),
            )
            .await?;

        tracing::info!(
            order_id = order.id,
            inhabitant_id = claimant.id,
            provenance_household_id = ?provenance,
            "Released ticket claimed"
        );
        Ok(claimed)
    }

    /// Switch between dine-in, late and takeaway
    pub async fn change_dinner_mode(
        &self,
        actor: &Actor,
        order_id: i64,
        mode: DinnerMode,
    ) -> AppResult<Order> {
        require_attending(mode)?;
        let order = self.order(order_id).await?;
        let holder = self.inhabitant(order.inhabitant_id).await?;
        actor.ensure_can_act_for(holder.household_id)?;
        if order.state != OrderState::Booked {
            return Err(AppError::new(ErrorCode::OrderNotBooked).with_detail("order_id", order.id));
        }
        if order.dinner_mode == mode {
            return Ok(order);
        }

        let updated = self
            .write(
                OrderWrite::Update {
                    id: order.id,
                    data: OrderUpdate {
                        dinner_mode: Some(mode),
                        ..Default::default()
                    },
                },
                OrderAuditAction::UserModeChanged,
                actor,
                json!({ "previous_mode": order.dinner_mode, "dinner_mode": mode }),
            )
            .await?;
        Ok(updated)
    }

    // ── lookups ─────────────────────────────────────────────────────

    async fn order(&self, id: i64) -> AppResult<Order> {
        self.repo
            .find_order(id)
            .await?
            .ok_or_else(|| AppError::order_not_found(id))
    }

    async fn inhabitant(&self, id: i64) -> AppResult<Inhabitant> {
        self.repo
            .find_inhabitants(&[id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                AppError::new(ErrorCode::InhabitantNotFound).with_detail("inhabitant_id", id)
            })
    }

    async fn event(&self, id: i64) -> AppResult<DinnerEvent> {
        self.repo
            .find_dinner_events_by_ids(&[id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::dinner_event_not_found(id))
    }

    async fn open_event(&self, id: i64) -> AppResult<DinnerEvent> {
        let event = self.event(id).await?;
        if event.state.is_cancelled() {
            return Err(AppError::new(ErrorCode::DinnerEventCancelled)
                .with_detail("dinner_event_id", id));
        }
        Ok(event)
    }

    async fn season(&self, id: i64) -> AppResult<Season> {
        self.repo
            .find_season(id)
            .await?
            .ok_or_else(|| AppError::season_not_found(id))
    }

    async fn prices(&self, season: &Season) -> AppResult<Vec<TicketPrice>> {
        let prices = self.repo.find_prices_by_season(season.id).await?;
        validate_price_list(&prices)?;
        Ok(prices)
    }

    fn deadline_days(&self, season: &Season) -> i64 {
        season
            .ticket_is_cancellable_days_before
            .unwrap_or(self.config.default_cancellation_days)
    }

    /// Order change and its history entry in one repository call
    async fn write(
        &self,
        write: OrderWrite,
        action: OrderAuditAction,
        actor: &Actor,
        context: serde_json::Value,
    ) -> AppResult<Order> {
        self.repo
            .apply_order_writes(vec![AuditedOrderWrite {
                write,
                action,
                performed_by_user_id: actor.user_id,
                context,
            }])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::internal("Order write returned no row"))
    }
}

fn require_attending(mode: DinnerMode) -> AppResult<()> {
    if mode.is_attending() {
        Ok(())
    } else {
        Err(AppError::validation("Dinner mode NONE cannot be booked")
            .with_detail("dinner_mode", mode.as_str()))
    }
}

fn resolve_price(
    inhabitant: &Inhabitant,
    prices: &[TicketPrice],
    event: &DinnerEvent,
) -> AppResult<TicketPrice> {
    resolve_for_inhabitant(inhabitant, prices, event.date)
        .cloned()
        .ok_or_else(|| {
            AppError::new(ErrorCode::TicketPriceUnresolved)
                .with_detail("inhabitant_id", inhabitant.id)
                .with_detail("dinner_event_id", event.id)
        })
}
