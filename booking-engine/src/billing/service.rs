//! Billing run: transactions, invoices, period summary, CSV order import

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::models::{
    BillingPeriodSummary, BillingPeriodSummaryCreate, DinnerEvent, Household, Inhabitant, Invoice,
    InvoiceCreate, Order, OrderCreate, OrderHistoryCreate, TicketPrice, TransactionCreate,
};
use shared::types::{DinnerMode, OrderAuditAction, TicketType};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::aggregator::{BillingPeriodAggregator, BillingPeriodStats};
use super::csv_export::write_export;
use super::csv_import::BillingImport;
use super::snapshot::{display_transactions, serialize_order};
use super::BillingPeriod;
use crate::core::Config;
use crate::db::{AuditedOrderWrite, BookingRepository, OrderWrite};
use crate::pricing::{default_price, resolve_for_inhabitant, ticket_type_for_amount};
use crate::utils::validation::{MAX_ADDRESS_LEN, validate_price_list, validate_required_text};
use crate::utils::{AppError, AppResult, ErrorCode};

/// Outcome of `create_transactions`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRun {
    pub billing_period: String,
    pub created: usize,
    /// Orders that already had a transaction
    pub already_billed: usize,
    /// Orders whose live relations were incomplete
    pub skipped: usize,
    pub amount: i64,
}

/// Outcome of `generate_invoices`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRun {
    pub summary: BillingPeriodSummary,
    pub invoices: Vec<Invoice>,
    pub stats: BillingPeriodStats,
}

/// Outcome of `import_orders`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub households: usize,
    pub created: usize,
    pub guest_tickets: usize,
    /// Tickets already covered by existing orders
    pub already_present: usize,
}

pub struct BillingService {
    repo: Arc<dyn BookingRepository>,
    config: Config,
}

impl BillingService {
    pub fn new(repo: Arc<dyn BookingRepository>, config: Config) -> Self {
        Self { repo, config }
    }

    /// Freeze one transaction per billable order that has none yet
    pub async fn create_transactions(&self, period: &BillingPeriod) -> AppResult<TransactionRun> {
        let mut run = TransactionRun {
            billing_period: period.label(),
            ..Default::default()
        };

        let orders = self.repo.find_billable_orders(period.start, period.end).await?;
        let order_ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        let billed: HashSet<i64> = self
            .repo
            .find_transactions_for_orders(&order_ids)
            .await?
            .into_iter()
            .filter_map(|t| t.order_id)
            .collect();
        let pending: Vec<Order> = orders
            .into_iter()
            .filter(|o| !billed.contains(&o.id))
            .collect();
        run.already_billed = billed.len();
        if pending.is_empty() {
            tracing::info!(billing_period = %period, "No new transactions to create");
            return Ok(run);
        }

        let inhabitant_ids: Vec<i64> = pending.iter().map(|o| o.inhabitant_id).collect();
        let inhabitants: HashMap<i64, Inhabitant> = self
            .repo
            .find_inhabitants(&inhabitant_ids)
            .await?
            .into_iter()
            .map(|i| (i.id, i))
            .collect();
        let mut household_ids: Vec<i64> = inhabitants.values().map(|i| i.household_id).collect();
        household_ids.extend(pending.iter().filter_map(|o| o.provenance_household_id));
        household_ids.sort_unstable();
        household_ids.dedup();
        let households: HashMap<i64, Household> = if household_ids.is_empty() {
            HashMap::new()
        } else {
            self.repo
                .find_households(&household_ids)
                .await?
                .into_iter()
                .map(|h| (h.id, h))
                .collect()
        };
        let event_ids: Vec<i64> = pending.iter().map(|o| o.dinner_event_id).collect();
        let events: HashMap<i64, DinnerEvent> = self
            .repo
            .find_dinner_events_by_ids(&event_ids)
            .await?
            .into_iter()
            .map(|e| (e.id, e))
            .collect();
        let price_ids: Vec<i64> = pending.iter().filter_map(|o| o.ticket_price_id).collect();
        let prices: HashMap<i64, TicketPrice> = self
            .repo
            .find_prices_by_ids(&price_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        for order in &pending {
            let Some((event, inhabitant, household)) = events
                .get(&order.dinner_event_id)
                .zip(inhabitants.get(&order.inhabitant_id))
                .and_then(|(e, i)| households.get(&i.household_id).map(|h| (e, i, h)))
            else {
                tracing::warn!(order_id = order.id, "Order relations incomplete, not billed");
                run.skipped += 1;
                continue;
            };
            let price = order.ticket_price_id.and_then(|id| prices.get(&id));
            let provenance = order
                .provenance_household_id
                .and_then(|id| households.get(&id));

            let order_snapshot =
                serialize_order(order, event, inhabitant, household, price, provenance)?;
            let tx = self
                .repo
                .create_transaction(TransactionCreate {
                    order_id: Some(order.id),
                    order_snapshot,
                    amount: order.price_at_booking,
                })
                .await
                .map_err(|e| {
                    AppError::from(e)
                        .with_detail("order_id", order.id)
                        .with_detail("household_id", household.id)
                })?;
            self.repo
                .append_order_history(OrderHistoryCreate::for_order(
                    order,
                    OrderAuditAction::SystemTransactionCreated,
                    None,
                    json!({ "transaction_id": tx.id, "amount": tx.amount }),
                ))
                .await?;
            run.created += 1;
            run.amount += tx.amount;
        }

        tracing::info!(
            billing_period = %period,
            created = run.created,
            already_billed = run.already_billed,
            skipped = run.skipped,
            amount = run.amount,
            "Transactions created"
        );
        Ok(run)
    }

    /// Invoice the period's open transactions per household and summarize
    pub async fn generate_invoices(
        &self,
        period: &BillingPeriod,
        cutoff_date: NaiveDate,
        payment_date: NaiveDate,
    ) -> AppResult<InvoiceRun> {
        let label = period.label();
        if !self.repo.find_invoices(&label).await?.is_empty() {
            return Err(AppError::with_message(
                ErrorCode::AlreadyExists,
                format!("Billing period {} is already invoiced", label),
            )
            .with_detail("billing_period", label));
        }

        let open = self.repo.find_uninvoiced_transactions().await?;
        let relations = self.repo.load_transaction_relations(&open).await?;
        let shown: Vec<_> = display_transactions(&open, &relations)
            .into_iter()
            .filter(|d| period.contains(d.dinner_date()))
            .collect();

        // household id -> (pbs id, address, transaction ids, amount), frozen from the snapshot
        let mut groups: BTreeMap<i64, (i64, String, Vec<i64>, i64)> = BTreeMap::new();
        for display in &shown {
            let entry = groups.entry(display.household.id).or_insert_with(|| {
                (
                    display.household.pbs_id,
                    display.household.address.clone(),
                    Vec::new(),
                    0,
                )
            });
            entry.2.push(display.transaction_id);
            entry.3 += display.amount;
        }

        let mut invoice_ids = Vec::with_capacity(groups.len());
        for (household_id, (pbs_id, address, transaction_ids, amount)) in groups {
            let live = relations.households.contains_key(&household_id);
            let invoice = self
                .repo
                .create_invoice(InvoiceCreate {
                    billing_period_summary_id: None,
                    household_id: live.then_some(household_id),
                    pbs_id,
                    address,
                    amount,
                    billing_period: label.clone(),
                    cutoff_date,
                    payment_date,
                    transaction_ids,
                })
                .await
                .map_err(|e| AppError::from(e).with_detail("household_id", household_id))?;
            tracing::debug!(invoice_id = invoice.id, household_id, amount, "Invoice created");
            invoice_ids.push(invoice.id);
        }

        let invoices = self.repo.find_invoices(&label).await?;
        let prices = self.prices_for(relations.dinner_events.values()).await?;
        let mut aggregator = BillingPeriodAggregator::new(&prices);
        for invoice in &invoices {
            aggregator.add_invoice(invoice);
        }
        let stats = aggregator.finish();

        let summary = self
            .repo
            .create_billing_period_summary(BillingPeriodSummaryCreate {
                billing_period: label.clone(),
                cutoff_date,
                payment_date,
                total_amount: invoices.iter().map(|i| i.amount).sum(),
                household_count: invoices.len() as i64,
                ticket_count: stats.ticket_count as i64,
                dinner_count: stats.dinner_count as i64,
            })
            .await?;
        self.repo
            .link_invoices_to_summary(summary.id, &invoice_ids)
            .await?;
        let invoices = self.repo.find_invoices(&label).await?;

        tracing::info!(
            billing_period = %label,
            invoices = invoices.len(),
            total_amount = summary.total_amount,
            tickets = stats.ticket_count,
            dinners = stats.dinner_count,
            "Billing period invoiced"
        );
        Ok(InvoiceRun {
            summary,
            invoices,
            stats,
        })
    }

    /// Write the payment-service export for an invoiced period
    pub async fn export_period(
        &self,
        dir: &Path,
        period: &BillingPeriod,
        cutoff_date: NaiveDate,
    ) -> AppResult<PathBuf> {
        let invoices = self.repo.find_invoices(&period.label()).await?;
        write_export(dir, &self.config.community_name, &invoices, period, cutoff_date)
    }

    async fn prices_for<'a>(
        &self,
        events: impl Iterator<Item = &'a DinnerEvent>,
    ) -> AppResult<Vec<TicketPrice>> {
        let season_ids: HashSet<i64> = events.map(|e| e.season_id).collect();
        let mut prices = Vec::new();
        for season_id in season_ids {
            prices.extend(self.repo.find_prices_by_season(season_id).await?);
        }
        Ok(prices)
    }

    /// Top up each household's orders to the imported ticket counts
    ///
    /// Every address and date is resolved before the first write. Existing
    /// orders count toward the targets, so importing the same file twice
    /// creates nothing the second time.
    pub async fn import_orders(
        &self,
        season_id: i64,
        import: &BillingImport,
    ) -> AppResult<ImportResult> {
        import.check_shape()?;
        self.repo
            .find_season(season_id)
            .await?
            .ok_or_else(|| AppError::season_not_found(season_id))?;
        let prices = self.repo.find_prices_by_season(season_id).await?;
        validate_price_list(&prices)?;

        let mut events = Vec::with_capacity(import.dates.len());
        for date in &import.dates {
            let event = self
                .repo
                .find_dinner_event_by_date(season_id, *date)
                .await?
                .ok_or_else(|| {
                    AppError::new(ErrorCode::ImportDateUnknown)
                        .with_detail("date", date.to_string())
                })?;
            events.push(event);
        }
        let mut households = Vec::with_capacity(import.rows.len());
        for row in &import.rows {
            validate_required_text(&row.address, "address", MAX_ADDRESS_LEN)?;
            let household = self
                .repo
                .find_household_by_address(&row.address)
                .await?
                .ok_or_else(|| {
                    AppError::new(ErrorCode::ImportAddressUnknown)
                        .with_detail("address", row.address.clone())
                        .with_detail("line", row.line)
                })?;
            let inhabitants = self
                .repo
                .find_inhabitants_by_households(&[household.id])
                .await?;
            let wanted = row.adults.iter().chain(&row.children).any(|n| *n > 0);
            if wanted && inhabitants.is_empty() {
                return Err(
                    AppError::validation("Household has no inhabitants to book for")
                        .with_detail("household_id", household.id)
                        .with_detail("line", row.line),
                );
            }
            households.push((household, inhabitants));
        }

        let event_ids: Vec<i64> = events.iter().map(|e| e.id).collect();
        let mut result = ImportResult {
            households: households.len(),
            ..Default::default()
        };

        for (row, (household, inhabitants)) in import.rows.iter().zip(&households) {
            let existing = self
                .repo
                .find_orders_by_household_and_events(&[household.id], &event_ids)
                .await?;

            for (index, event) in events.iter().enumerate() {
                let targets = [
                    (TicketType::Adult, row.adults[index]),
                    (TicketType::Child, row.children[index]),
                ];
                for (group, target) in targets {
                    let plan = plan_import_tickets(
                        group,
                        target,
                        inhabitants,
                        existing.iter().filter(|o| o.dinner_event_id == event.id),
                        &prices,
                        event,
                    );
                    result.already_present += plan.present;

                    if plan.tickets.is_empty() {
                        continue;
                    }
                    let writes = plan
                        .tickets
                        .into_iter()
                        .map(|ticket| AuditedOrderWrite {
                            write: OrderWrite::Create(ticket),
                            action: OrderAuditAction::SystemImported,
                            performed_by_user_id: None,
                            context: json!({ "line": row.line, "date": event.date }),
                        })
                        .collect();
                    let created = self.repo.apply_order_writes(writes).await.map_err(|e| {
                        AppError::from(e)
                            .with_detail("household_id", household.id)
                            .with_detail("dinner_event_id", event.id)
                    })?;
                    result.created += created.len();
                    result.guest_tickets += created.iter().filter(|o| o.is_guest_ticket).count();
                }
            }
        }

        tracing::info!(
            season_id,
            households = result.households,
            created = result.created,
            guest_tickets = result.guest_tickets,
            already_present = result.already_present,
            "Billing CSV imported"
        );
        Ok(result)
    }
}

/// Adults are ADULT tickets, children are every other category
fn in_group(group: TicketType, ticket_type: TicketType) -> bool {
    (group == TicketType::Adult) == (ticket_type == TicketType::Adult)
}

struct ImportTickets {
    present: usize,
    tickets: Vec<OrderCreate>,
}

fn plan_import_tickets<'a>(
    group: TicketType,
    target: u32,
    inhabitants: &[Inhabitant],
    event_orders: impl Iterator<Item = &'a Order>,
    prices: &[TicketPrice],
    event: &DinnerEvent,
) -> ImportTickets {
    let event_orders: Vec<&Order> = event_orders.collect();
    let present = event_orders
        .iter()
        .filter(|o| {
            let ticket_type = o
                .ticket_price_id
                .and_then(|id| prices.iter().find(|p| p.id == id))
                .map(|p| p.ticket_type)
                .unwrap_or_else(|| ticket_type_for_amount(o.price_at_booking, prices));
            in_group(group, ticket_type)
        })
        .count();
    let missing = (target as usize).saturating_sub(present);
    let present = present.min(target as usize);
    let mut tickets = Vec::with_capacity(missing);
    if missing == 0 {
        return ImportTickets { present, tickets };
    }

    let booked: HashSet<i64> = event_orders
        .iter()
        .filter(|o| !o.is_guest_ticket)
        .map(|o| o.inhabitant_id)
        .collect();
    let mut candidates = inhabitants.iter().filter_map(|i| {
        if booked.contains(&i.id) {
            return None;
        }
        resolve_for_inhabitant(i, prices, event.date)
            .filter(|p| in_group(group, p.ticket_type))
            .map(|p| (i, p))
    });

    let guest_price = guest_price(group, prices);
    for _ in 0..missing {
        let ticket = match candidates.next() {
            Some((inhabitant, price)) => OrderCreate {
                dinner_event_id: event.id,
                inhabitant_id: inhabitant.id,
                booked_by_user_id: None,
                ticket_price_id: Some(price.id),
                price_at_booking: price.price,
                dinner_mode: DinnerMode::DineIn,
                is_guest_ticket: false,
            },
            None => {
                let (Some(host), Some(price)) = (inhabitants.first(), guest_price) else {
                    break;
                };
                OrderCreate {
                    dinner_event_id: event.id,
                    inhabitant_id: host.id,
                    booked_by_user_id: None,
                    ticket_price_id: Some(price.id),
                    price_at_booking: price.price,
                    dinner_mode: DinnerMode::DineIn,
                    is_guest_ticket: true,
                }
            }
        };
        tickets.push(ticket);
    }
    ImportTickets { present, tickets }
}

/// Price for a guest ticket of the group: adult default, or the dearest child tier
fn guest_price(group: TicketType, prices: &[TicketPrice]) -> Option<&TicketPrice> {
    if group == TicketType::Adult {
        return default_price(prices);
    }
    prices
        .iter()
        .filter(|p| p.ticket_type == TicketType::Child)
        .max_by_key(|p| p.price)
        .or_else(|| default_price(prices))
}

