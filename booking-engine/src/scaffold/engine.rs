//! Reconciliation engine
//!
//! Loads the in-scope state through [`BookingRepository`], asks the planner for
//! a bucketed plan and applies it bucket by bucket in fixed-size batches. Each
//! batch writes its rows together with the matching history entries in one
//! repository call.

use chrono::NaiveDate;
use shared::models::Season;
use shared::types::OrderAuditAction;
use shared::util::now_millis;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use super::error::{ScaffoldError, ScaffoldOutcome};
use super::plan::{PlanInput, PlannedUpdate, ScaffoldPlan, plan_scaffold};
use super::result::{Bucket, ScaffoldResult};
use crate::core::{Actor, Config};
use crate::db::{AuditedOrderWrite, BookingRepository, OrderWrite, RepoError};
use crate::utils::validation::validate_price_list;
use crate::utils::{AppError, ErrorCode};

/// Which households a run covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HouseholdScope {
    /// Every household (privileged actors only)
    All,
    Households(Vec<i64>),
}

/// One reconciliation request
#[derive(Debug, Clone)]
pub struct ScaffoldRequest {
    pub season_id: i64,
    pub scope: HouseholdScope,
    pub actor: Actor,
    /// Overrides the business-time-zone date
    pub today: Option<NaiveDate>,
}

impl ScaffoldRequest {
    pub fn new(season_id: i64, scope: HouseholdScope, actor: Actor) -> Self {
        Self {
            season_id,
            scope,
            actor,
            today: None,
        }
    }

    pub fn on(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }
}

/// A computed plan plus the figures needed to report on it
#[derive(Debug, Clone)]
pub struct PreparedScaffold {
    pub season_id: i64,
    pub households_touched: usize,
    pub today: NaiveDate,
    pub deadline_days: i64,
    pub plan: ScaffoldPlan,
}

impl PreparedScaffold {
    /// Result of applying the whole plan
    pub fn expected_result(&self) -> ScaffoldResult {
        self.plan
            .expected_result(self.season_id, self.households_touched)
    }
}

/// Order scaffolding engine
pub struct OrderScaffoldEngine {
    repo: Arc<dyn BookingRepository>,
    config: Config,
}

impl std::fmt::Debug for OrderScaffoldEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderScaffoldEngine")
            .field("batch_size", &self.config.scaffold_batch_size)
            .finish_non_exhaustive()
    }
}

impl OrderScaffoldEngine {
    pub fn new(repo: Arc<dyn BookingRepository>, config: Config) -> Self {
        Self { repo, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Compute the plan without writing anything
    pub async fn plan(&self, request: &ScaffoldRequest) -> ScaffoldOutcome<PreparedScaffold> {
        authorize(request)?;

        let season_id = request.season_id;
        let season = self
            .repo
            .find_season(season_id)
            .await?
            .ok_or_else(|| AppError::season_not_found(season_id))?;

        let prices = self.repo.find_prices_by_season(season_id).await?;
        let price_season = validate_price_list(&prices)?;
        if price_season != season_id {
            return Err(AppError::new(ErrorCode::PriceListMixedSeasons)
                .with_detail("season_id", season_id)
                .with_detail("price_season_id", price_season)
                .into());
        }

        let households = match &request.scope {
            HouseholdScope::All => self.repo.find_households(&[]).await?,
            HouseholdScope::Households(ids) => {
                let found = self.repo.find_households(ids).await?;
                if let Some(missing) = ids.iter().find(|id| !found.iter().any(|h| h.id == **id)) {
                    return Err(AppError::household_not_found(*missing).into());
                }
                found
            }
        };
        let household_ids: Vec<i64> = households.iter().map(|h| h.id).collect();

        let today = request.today.unwrap_or_else(|| self.config.today());
        let deadline_days = deadline_days(&season, &self.config);

        let events: Vec<_> = self
            .repo
            .find_dinner_events(season_id, today)
            .await?
            .into_iter()
            .filter(|e| !e.state.is_cancelled() && season.is_cooking_date(e.date))
            .collect();
        let event_ids: Vec<i64> = events.iter().map(|e| e.id).collect();

        let inhabitants = if household_ids.is_empty() {
            Vec::new()
        } else {
            self.repo.find_inhabitants_by_households(&household_ids).await?
        };
        let inhabitant_ids: Vec<i64> = inhabitants.iter().map(|i| i.id).collect();

        let (orders, pool, history) = if event_ids.is_empty() || inhabitant_ids.is_empty() {
            (Vec::new(), Vec::new(), Vec::new())
        } else {
            (
                self.repo
                    .find_orders_by_household_and_events(&household_ids, &event_ids)
                    .await?,
                self.repo.find_released_orders_for_events(&event_ids).await?,
                self.repo
                    .find_order_history_for(&inhabitant_ids, &event_ids)
                    .await?,
            )
        };

        let holder_ids: Vec<i64> = pool
            .iter()
            .map(|o| o.inhabitant_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let pool_holders: HashMap<i64, i64> = if holder_ids.is_empty() {
            HashMap::new()
        } else {
            self.repo
                .find_inhabitants(&holder_ids)
                .await?
                .into_iter()
                .map(|i| (i.id, i.household_id))
                .collect()
        };

        let plan = plan_scaffold(&PlanInput {
            season_id,
            events: &events,
            inhabitants: &inhabitants,
            orders: &orders,
            released_pool: &pool,
            pool_holders: &pool_holders,
            history: &history,
            prices: &prices,
            today,
            deadline_days,
            actor_user_id: request.actor.user_id,
            now: now_millis(),
        });

        tracing::debug!(
            season_id,
            households = household_ids.len(),
            events = events.len(),
            inhabitants = inhabitants.len(),
            create = plan.create.len(),
            update = plan.update.len(),
            claim = plan.claim.len(),
            release = plan.release.len(),
            delete = plan.delete.len(),
            price_update = plan.price_update.len(),
            "Scaffold plan computed"
        );

        Ok(PreparedScaffold {
            season_id,
            households_touched: household_ids.len(),
            today,
            deadline_days,
            plan,
        })
    }

    /// Plan and apply
    pub async fn run(&self, request: &ScaffoldRequest) -> ScaffoldOutcome<ScaffoldResult> {
        let prepared = self.plan(request).await?;
        self.apply(prepared, &request.actor).await
    }

    /// Apply a prepared plan in bucket order
    pub async fn apply(
        &self,
        prepared: PreparedScaffold,
        actor: &Actor,
    ) -> ScaffoldOutcome<ScaffoldResult> {
        let PreparedScaffold {
            season_id,
            households_touched,
            plan,
            ..
        } = prepared;
        let mut result = ScaffoldResult::new(season_id, households_touched);
        result.unchanged = plan.unchanged;
        result.skipped_cancelled = plan.skipped_cancelled;
        result.unfulfilled = plan.unfulfilled;

        if plan.is_empty() {
            tracing::info!(season_id, households_touched, "Scaffold found nothing to change");
            return Ok(result);
        }

        let user_id = actor.user_id;

        self.apply_bucket(
            Bucket::Create,
            &plan.create,
            &mut result,
            |c| AuditedOrderWrite {
                write: OrderWrite::Create(c.order.clone()),
                action: OrderAuditAction::SystemCreated,
                performed_by_user_id: user_id,
                context: c.context.clone(),
            },
            |r, _| r.created += 1,
        )
        .await?;
        self.apply_bucket(
            Bucket::Update,
            &plan.update,
            &mut result,
            |u| audited_update(u, user_id),
            |r, u| {
                if u.action == OrderAuditAction::SystemModeUpdated {
                    r.mode_updated += 1;
                } else {
                    r.reclaimed += 1;
                }
            },
        )
        .await?;
        self.apply_bucket(
            Bucket::Claim,
            &plan.claim,
            &mut result,
            |u| audited_update(u, user_id),
            |r, _| r.claimed += 1,
        )
        .await?;
        self.apply_bucket(
            Bucket::Release,
            &plan.release,
            &mut result,
            |u| audited_update(u, user_id),
            |r, _| r.released += 1,
        )
        .await?;
        self.apply_bucket(
            Bucket::Delete,
            &plan.delete,
            &mut result,
            |d| AuditedOrderWrite {
                write: OrderWrite::Delete(d.order.clone()),
                action: OrderAuditAction::SystemDeleted,
                performed_by_user_id: user_id,
                context: d.context.clone(),
            },
            |r, _| r.deleted += 1,
        )
        .await?;
        self.apply_bucket(
            Bucket::PriceUpdate,
            &plan.price_update,
            &mut result,
            |u| audited_update(u, user_id),
            |r, _| r.price_updated += 1,
        )
        .await?;

        tracing::info!(
            season_id,
            households_touched,
            created = result.created,
            mode_updated = result.mode_updated,
            reclaimed = result.reclaimed,
            claimed = result.claimed,
            released = result.released,
            deleted = result.deleted,
            price_updated = result.price_updated,
            skipped_cancelled = result.skipped_cancelled,
            unfulfilled = result.unfulfilled,
            "Scaffold applied"
        );
        Ok(result)
    }

    /// Write one bucket in batches; a batch lands with its history or not at all
    async fn apply_bucket<T: Sync>(
        &self,
        bucket: Bucket,
        items: &[T],
        result: &mut ScaffoldResult,
        to_write: impl Fn(&T) -> AuditedOrderWrite + Send + Sync,
        tally: impl Fn(&mut ScaffoldResult, &T) + Send + Sync,
    ) -> ScaffoldOutcome<()> {
        for chunk in items.chunks(self.config.scaffold_batch_size.max(1)) {
            let writes = chunk.iter().map(&to_write).collect();
            self.repo
                .apply_order_writes(writes)
                .await
                .map_err(|e| partial(bucket, &*result, e))?;
            for planned in chunk {
                tally(result, planned);
            }
        }
        Ok(())
    }
}

fn audited_update(planned: &PlannedUpdate, user_id: Option<i64>) -> AuditedOrderWrite {
    AuditedOrderWrite {
        write: OrderWrite::Update {
            id: planned.order_id,
            data: planned.update.clone(),
        },
        action: planned.action,
        performed_by_user_id: user_id,
        context: planned.context.clone(),
    }
}

fn authorize(request: &ScaffoldRequest) -> Result<(), AppError> {
    match &request.scope {
        HouseholdScope::All => request.actor.ensure_privileged(),
        HouseholdScope::Households(ids) => {
            if ids.is_empty() {
                return Err(AppError::with_message(
                    ErrorCode::RequiredField,
                    "At least one household is required",
                )
                .with_detail("field", "households"));
            }
            ids.iter()
                .try_for_each(|id| request.actor.ensure_can_act_for(*id))
        }
    }
}

fn deadline_days(season: &Season, config: &Config) -> i64 {
    season
        .ticket_is_cancellable_days_before
        .unwrap_or(config.default_cancellation_days)
}

fn partial(bucket: Bucket, completed: &ScaffoldResult, source: RepoError) -> ScaffoldError {
    tracing::error!(
        season_id = completed.season_id,
        bucket = %bucket,
        error = %source,
        "Scaffold batch failed"
    );
    ScaffoldError::PartialApply {
        season_id: completed.season_id,
        bucket,
        completed: Box::new(completed.clone()),
        source,
    }
}
