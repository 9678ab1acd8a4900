//! In-process repository
//!
//! Ordered maps behind one `parking_lot::RwLock`. Ids are sequential per store.
//! Foreign keys follow the relational model: deleting an order nulls
//! `Transaction.order_id` and leaves `OrderHistory` untouched.

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::{Mutex, RwLock};
use shared::models::{
    BillingPeriodSummary, BillingPeriodSummaryCreate, DinnerEvent, DinnerPreferences, Household,
    Inhabitant, Invoice, InvoiceCreate, Order, OrderCreate, OrderHistory, OrderHistoryCreate,
    OrderUpdate, Season, TicketPrice, Transaction, TransactionCreate,
};
use shared::types::OrderState;
use shared::util::now_millis;
use std::collections::{BTreeMap, HashSet};

use super::{AuditedOrderWrite, BookingRepository, OrderWrite, RepoError, RepoResult};

#[derive(Debug, Clone, Default)]
struct Tables {
    next_id: i64,
    seasons: BTreeMap<i64, Season>,
    households: BTreeMap<i64, Household>,
    inhabitants: BTreeMap<i64, Inhabitant>,
    dinner_events: BTreeMap<i64, DinnerEvent>,
    prices: BTreeMap<i64, TicketPrice>,
    orders: BTreeMap<i64, Order>,
    history: Vec<OrderHistory>,
    transactions: BTreeMap<i64, Transaction>,
    invoices: BTreeMap<i64, Invoice>,
    summaries: BTreeMap<i64, BillingPeriodSummary>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn with_transactions(&self, invoice: &Invoice) -> Invoice {
        let mut invoice = invoice.clone();
        invoice.transactions = self
            .transactions
            .values()
            .filter(|t| t.invoice_id == Some(invoice.id))
            .cloned()
            .collect();
        invoice
    }

    fn create_order(&mut self, data: OrderCreate) -> RepoResult<Order> {
        if !self.inhabitants.contains_key(&data.inhabitant_id) {
            return Err(RepoError::NotFound(format!(
                "Inhabitant {} not found",
                data.inhabitant_id
            )));
        }
        if !self.dinner_events.contains_key(&data.dinner_event_id) {
            return Err(RepoError::NotFound(format!(
                "Dinner event {} not found",
                data.dinner_event_id
            )));
        }
        if !data.is_guest_ticket
            && self.orders.values().any(|o| {
                !o.is_guest_ticket
                    && o.inhabitant_id == data.inhabitant_id
                    && o.dinner_event_id == data.dinner_event_id
            })
        {
            return Err(RepoError::Duplicate(format!(
                "Order for inhabitant {} at dinner {}",
                data.inhabitant_id, data.dinner_event_id
            )));
        }
        let now = now_millis();
        let order = Order {
            id: self.next_id(),
            dinner_event_id: data.dinner_event_id,
            inhabitant_id: data.inhabitant_id,
            booked_by_user_id: data.booked_by_user_id,
            ticket_price_id: data.ticket_price_id,
            price_at_booking: data.price_at_booking,
            dinner_mode: data.dinner_mode,
            state: OrderState::Booked,
            is_guest_ticket: data.is_guest_ticket,
            provenance_household_id: None,
            released_at: None,
            created_at: now,
            updated_at: now,
        };
        self.orders.insert(order.id, order.clone());
        Ok(order)
    }

    fn update_order(&mut self, id: i64, data: OrderUpdate) -> RepoResult<Order> {
        let order = self
            .orders
            .get_mut(&id)
            .ok_or_else(|| RepoError::NotFound(format!("Order {} not found", id)))?;
        data.apply_to(order, now_millis());
        Ok(order.clone())
    }

    /// Removes the row and nulls transaction references to it
    fn delete_order(&mut self, id: i64) -> Option<Order> {
        let order = self.orders.remove(&id)?;
        for tx in self.transactions.values_mut() {
            if tx.order_id == Some(id) {
                tx.order_id = None;
            }
        }
        Some(order)
    }

    fn push_history(&mut self, entry: OrderHistoryCreate) -> OrderHistory {
        let row = OrderHistory {
            id: self.next_id(),
            order_id: entry.order_id,
            inhabitant_id: entry.inhabitant_id,
            dinner_event_id: entry.dinner_event_id,
            action: entry.action,
            performed_by_user_id: entry.performed_by_user_id,
            audit_data: entry.audit_data,
            timestamp: now_millis(),
        };
        self.history.push(row.clone());
        row
    }
}

/// In-memory [`BookingRepository`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    /// Remaining successful writes before injected failures start
    fail_after: Mutex<Option<usize>>,
}

fn normalize_address(address: &str) -> String {
    address.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write after the next `writes` successful ones fail. Inside
    /// [`BookingRepository::apply_order_writes`] each row and each history entry
    /// counts as one write.
    pub fn fail_after_writes(&self, writes: usize) {
        *self.fail_after.lock() = Some(writes);
    }

    pub fn clear_failures(&self) {
        *self.fail_after.lock() = None;
    }

    fn check_write(&self) -> RepoResult<()> {
        let mut remaining = self.fail_after.lock();
        match remaining.as_mut() {
            Some(0) => Err(RepoError::Database("injected write failure".into())),
            Some(n) => {
                *n -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    // ── Seeding ─────────────────────────────────────────────────────

    pub fn insert_season(&self, mut season: Season) -> Season {
        let mut t = self.tables.write();
        if season.id == 0 {
            season.id = t.next_id();
        }
        t.seasons.insert(season.id, season.clone());
        season
    }

    pub fn insert_household(&self, mut household: Household) -> Household {
        let mut t = self.tables.write();
        if household.id == 0 {
            household.id = t.next_id();
        }
        t.households.insert(household.id, household.clone());
        household
    }

    pub fn insert_inhabitant(&self, mut inhabitant: Inhabitant) -> Inhabitant {
        let mut t = self.tables.write();
        if inhabitant.id == 0 {
            inhabitant.id = t.next_id();
        }
        t.inhabitants.insert(inhabitant.id, inhabitant.clone());
        inhabitant
    }

    pub fn insert_dinner_event(&self, mut event: DinnerEvent) -> DinnerEvent {
        let mut t = self.tables.write();
        if event.id == 0 {
            event.id = t.next_id();
        }
        t.dinner_events.insert(event.id, event.clone());
        event
    }

    pub fn insert_ticket_price(&self, mut price: TicketPrice) -> TicketPrice {
        let mut t = self.tables.write();
        if price.id == 0 {
            price.id = t.next_id();
        }
        t.prices.insert(price.id, price.clone());
        price
    }

    pub fn set_preferences(&self, inhabitant_id: i64, preferences: Option<DinnerPreferences>) {
        if let Some(i) = self.tables.write().inhabitants.get_mut(&inhabitant_id) {
            i.dinner_preferences = preferences;
        }
    }

    pub fn set_birth_date(&self, inhabitant_id: i64, birth_date: Option<NaiveDate>) {
        if let Some(i) = self.tables.write().inhabitants.get_mut(&inhabitant_id) {
            i.birth_date = birth_date;
        }
    }

    pub fn update_household(&self, household: Household) {
        self.tables.write().households.insert(household.id, household);
    }

    pub fn remove_ticket_price(&self, id: i64) {
        let mut t = self.tables.write();
        t.prices.remove(&id);
        for order in t.orders.values_mut() {
            if order.ticket_price_id == Some(id) {
                order.ticket_price_id = None;
            }
        }
    }

    /// Household delete cascades to inhabitants and their orders
    pub fn remove_household(&self, id: i64) {
        let mut t = self.tables.write();
        t.households.remove(&id);
        let gone: HashSet<i64> = t
            .inhabitants
            .values()
            .filter(|i| i.household_id == id)
            .map(|i| i.id)
            .collect();
        t.inhabitants.retain(|k, _| !gone.contains(k));
        let gone_orders: HashSet<i64> = t
            .orders
            .values()
            .filter(|o| gone.contains(&o.inhabitant_id))
            .map(|o| o.id)
            .collect();
        t.orders.retain(|k, _| !gone_orders.contains(k));
        for tx in t.transactions.values_mut() {
            if tx.order_id.is_some_and(|o| gone_orders.contains(&o)) {
                tx.order_id = None;
            }
        }
        for invoice in t.invoices.values_mut() {
            if invoice.household_id == Some(id) {
                invoice.household_id = None;
            }
        }
    }

    /// Bypasses uniqueness checks; for fixtures only
    pub fn insert_order(&self, mut order: Order) -> Order {
        let mut t = self.tables.write();
        if order.id == 0 {
            order.id = t.next_id();
        }
        t.orders.insert(order.id, order.clone());
        order
    }

    pub fn insert_history(&self, entry: OrderHistoryCreate) -> OrderHistory {
        self.tables.write().push_history(entry)
    }

    // ── Inspection ──────────────────────────────────────────────────

    pub fn orders(&self) -> Vec<Order> {
        self.tables.read().orders.values().cloned().collect()
    }

    pub fn history(&self) -> Vec<OrderHistory> {
        self.tables.read().history.clone()
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.tables.read().transactions.values().cloned().collect()
    }

    pub fn summaries(&self) -> Vec<BillingPeriodSummary> {
        self.tables.read().summaries.values().cloned().collect()
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn find_season(&self, season_id: i64) -> RepoResult<Option<Season>> {
        Ok(self.tables.read().seasons.get(&season_id).cloned())
    }

    async fn find_dinner_events(
        &self,
        season_id: i64,
        from: NaiveDate,
    ) -> RepoResult<Vec<DinnerEvent>> {
        let t = self.tables.read();
        let mut events: Vec<DinnerEvent> = t
            .dinner_events
            .values()
            .filter(|e| e.season_id == season_id && e.date >= from)
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.date, e.id));
        Ok(events)
    }

    async fn find_dinner_events_by_ids(&self, ids: &[i64]) -> RepoResult<Vec<DinnerEvent>> {
        let t = self.tables.read();
        Ok(t.dinner_events
            .values()
            .filter(|e| ids.contains(&e.id))
            .cloned()
            .collect())
    }

    async fn find_dinner_event_by_date(
        &self,
        season_id: i64,
        date: NaiveDate,
    ) -> RepoResult<Option<DinnerEvent>> {
        let t = self.tables.read();
        Ok(t.dinner_events
            .values()
            .find(|e| e.season_id == season_id && e.date == date)
            .cloned())
    }

    async fn find_prices_by_season(&self, season_id: i64) -> RepoResult<Vec<TicketPrice>> {
        let t = self.tables.read();
        Ok(t.prices
            .values()
            .filter(|p| p.season_id == season_id)
            .cloned()
            .collect())
    }

    async fn find_prices_by_ids(&self, ids: &[i64]) -> RepoResult<Vec<TicketPrice>> {
        let t = self.tables.read();
        Ok(t.prices.values().filter(|p| ids.contains(&p.id)).cloned().collect())
    }

    async fn find_households(&self, ids: &[i64]) -> RepoResult<Vec<Household>> {
        let t = self.tables.read();
        Ok(t.households
            .values()
            .filter(|h| ids.is_empty() || ids.contains(&h.id))
            .cloned()
            .collect())
    }

    async fn find_household_by_address(&self, address: &str) -> RepoResult<Option<Household>> {
        let wanted = normalize_address(address);
        let t = self.tables.read();
        Ok(t.households
            .values()
            .find(|h| normalize_address(&h.address) == wanted)
            .cloned())
    }

    async fn find_inhabitants_by_households(
        &self,
        household_ids: &[i64],
    ) -> RepoResult<Vec<Inhabitant>> {
        let t = self.tables.read();
        Ok(t.inhabitants
            .values()
            .filter(|i| household_ids.contains(&i.household_id))
            .cloned()
            .collect())
    }

    async fn find_inhabitants(&self, ids: &[i64]) -> RepoResult<Vec<Inhabitant>> {
        let t = self.tables.read();
        Ok(t.inhabitants
            .values()
            .filter(|i| ids.contains(&i.id))
            .cloned()
            .collect())
    }

    async fn find_order(&self, id: i64) -> RepoResult<Option<Order>> {
        Ok(self.tables.read().orders.get(&id).cloned())
    }

    async fn find_orders_by_ids(&self, ids: &[i64]) -> RepoResult<Vec<Order>> {
        let t = self.tables.read();
        Ok(t.orders.values().filter(|o| ids.contains(&o.id)).cloned().collect())
    }

    async fn find_orders_by_household_and_events(
        &self,
        household_ids: &[i64],
        event_ids: &[i64],
    ) -> RepoResult<Vec<Order>> {
        let t = self.tables.read();
        let members: HashSet<i64> = t
            .inhabitants
            .values()
            .filter(|i| household_ids.contains(&i.household_id))
            .map(|i| i.id)
            .collect();
        Ok(t.orders
            .values()
            .filter(|o| members.contains(&o.inhabitant_id) && event_ids.contains(&o.dinner_event_id))
            .cloned()
            .collect())
    }

    async fn find_released_orders_for_events(&self, event_ids: &[i64]) -> RepoResult<Vec<Order>> {
        let t = self.tables.read();
        Ok(t.orders
            .values()
            .filter(|o| o.state == OrderState::Released && event_ids.contains(&o.dinner_event_id))
            .cloned()
            .collect())
    }

    async fn find_order_history_for(
        &self,
        inhabitant_ids: &[i64],
        event_ids: &[i64],
    ) -> RepoResult<Vec<OrderHistory>> {
        let t = self.tables.read();
        Ok(t.history
            .iter()
            .filter(|h| {
                inhabitant_ids.contains(&h.inhabitant_id) && event_ids.contains(&h.dinner_event_id)
            })
            .cloned()
            .collect())
    }

    async fn find_billable_orders(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> RepoResult<Vec<Order>> {
        let t = self.tables.read();
        let events: HashSet<i64> = t
            .dinner_events
            .values()
            .filter(|e| start <= e.date && e.date <= end && !e.state.is_cancelled())
            .map(|e| e.id)
            .collect();
        Ok(t.orders
            .values()
            .filter(|o| events.contains(&o.dinner_event_id))
            .cloned()
            .collect())
    }

    async fn append_order_history(&self, entry: OrderHistoryCreate) -> RepoResult<OrderHistory> {
        self.check_write()?;
        Ok(self.tables.write().push_history(entry))
    }

    async fn apply_order_writes(&self, writes: Vec<AuditedOrderWrite>) -> RepoResult<Vec<Order>> {
        let mut tables = self.tables.write();
        // staged on a copy, committed only when every row and entry succeeded
        let mut staged = tables.clone();
        let mut written = Vec::with_capacity(writes.len());
        for AuditedOrderWrite {
            write,
            action,
            performed_by_user_id,
            context,
        } in writes
        {
            self.check_write()?;
            let order = match write {
                OrderWrite::Create(data) => staged.create_order(data)?,
                OrderWrite::Update { id, data } => staged.update_order(id, data)?,
                OrderWrite::Delete(order) => staged.delete_order(order.id).unwrap_or(order),
            };
            self.check_write()?;
            staged.push_history(OrderHistoryCreate::for_order(
                &order,
                action,
                performed_by_user_id,
                context,
            ));
            written.push(order);
        }
        *tables = staged;
        Ok(written)
    }

    async fn find_transactions_for_orders(
        &self,
        order_ids: &[i64],
    ) -> RepoResult<Vec<Transaction>> {
        let t = self.tables.read();
        Ok(t.transactions
            .values()
            .filter(|tx| tx.order_id.is_some_and(|o| order_ids.contains(&o)))
            .cloned()
            .collect())
    }

    async fn find_uninvoiced_transactions(&self) -> RepoResult<Vec<Transaction>> {
        let t = self.tables.read();
        Ok(t.transactions
            .values()
            .filter(|tx| tx.invoice_id.is_none())
            .cloned()
            .collect())
    }

    async fn find_invoices(&self, billing_period: &str) -> RepoResult<Vec<Invoice>> {
        let t = self.tables.read();
        Ok(t.invoices
            .values()
            .filter(|i| i.billing_period == billing_period)
            .map(|i| t.with_transactions(i))
            .collect())
    }

    async fn create_transaction(&self, data: TransactionCreate) -> RepoResult<Transaction> {
        self.check_write()?;
        let mut t = self.tables.write();
        let tx = Transaction {
            id: t.next_id(),
            order_id: data.order_id,
            order_snapshot: data.order_snapshot,
            amount: data.amount,
            invoice_id: None,
            created_at: now_millis(),
        };
        t.transactions.insert(tx.id, tx.clone());
        Ok(tx)
    }

    async fn create_invoice(&self, data: InvoiceCreate) -> RepoResult<Invoice> {
        self.check_write()?;
        let mut t = self.tables.write();
        if let Some(taken) = data
            .transaction_ids
            .iter()
            .find(|id| t.transactions.get(*id).is_some_and(|tx| tx.invoice_id.is_some()))
        {
            return Err(RepoError::Duplicate(format!(
                "Transaction {} already invoiced",
                taken
            )));
        }
        let invoice = Invoice {
            id: t.next_id(),
            billing_period_summary_id: data.billing_period_summary_id,
            household_id: data.household_id,
            pbs_id: data.pbs_id,
            address: data.address,
            amount: data.amount,
            billing_period: data.billing_period,
            cutoff_date: data.cutoff_date,
            payment_date: data.payment_date,
            created_at: now_millis(),
            transactions: Vec::new(),
        };
        for id in &data.transaction_ids {
            if let Some(tx) = t.transactions.get_mut(id) {
                tx.invoice_id = Some(invoice.id);
            }
        }
        t.invoices.insert(invoice.id, invoice.clone());
        Ok(t.with_transactions(&invoice))
    }

    async fn create_billing_period_summary(
        &self,
        data: BillingPeriodSummaryCreate,
    ) -> RepoResult<BillingPeriodSummary> {
        self.check_write()?;
        let mut t = self.tables.write();
        if t.summaries.values().any(|s| s.billing_period == data.billing_period) {
            return Err(RepoError::Duplicate(format!(
                "Billing period {}",
                data.billing_period
            )));
        }
        let summary = BillingPeriodSummary {
            id: t.next_id(),
            billing_period: data.billing_period,
            cutoff_date: data.cutoff_date,
            payment_date: data.payment_date,
            total_amount: data.total_amount,
            household_count: data.household_count,
            ticket_count: data.ticket_count,
            dinner_count: data.dinner_count,
            created_at: now_millis(),
        };
        t.summaries.insert(summary.id, summary.clone());
        Ok(summary)
    }

    async fn link_invoices_to_summary(
        &self,
        summary_id: i64,
        invoice_ids: &[i64],
    ) -> RepoResult<()> {
        self.check_write()?;
        let mut t = self.tables.write();
        for id in invoice_ids {
            if let Some(invoice) = t.invoices.get_mut(id) {
                invoice.billing_period_summary_id = Some(summary_id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::types::{DinnerMode, DinnerState, OrderAuditAction};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seed(store: &MemoryStore) -> (Household, Inhabitant, DinnerEvent) {
        let household = store.insert_household(Household {
            id: 0,
            heynabo_id: None,
            pbs_id: 1001,
            name: "Jensen".into(),
            address: "Skråningen  1".into(),
        });
        let inhabitant = store.insert_inhabitant(Inhabitant {
            id: 0,
            household_id: household.id,
            heynabo_id: None,
            name: "Anna".into(),
            last_name: "Jensen".into(),
            birth_date: None,
            dinner_preferences: None,
            user_id: None,
        });
        let event = store.insert_dinner_event(DinnerEvent {
            id: 0,
            season_id: 1,
            date: date(2025, 3, 4),
            menu_title: "Suppe".into(),
            menu_description: None,
            total_cost: 0,
            state: DinnerState::Scheduled,
        });
        (household, inhabitant, event)
    }

    fn order_for(inhabitant: &Inhabitant, event: &DinnerEvent) -> OrderCreate {
        OrderCreate {
            dinner_event_id: event.id,
            inhabitant_id: inhabitant.id,
            booked_by_user_id: None,
            ticket_price_id: None,
            price_at_booking: 4_500,
            dinner_mode: DinnerMode::DineIn,
            is_guest_ticket: false,
        }
    }

    fn audited(write: OrderWrite, action: OrderAuditAction) -> AuditedOrderWrite {
        AuditedOrderWrite {
            write,
            action,
            performed_by_user_id: None,
            context: serde_json::json!({}),
        }
    }

    async fn create(store: &MemoryStore, data: OrderCreate) -> RepoResult<Order> {
        let mut written = store
            .apply_order_writes(vec![audited(
                OrderWrite::Create(data),
                OrderAuditAction::SystemCreated,
            )])
            .await?;
        Ok(written.remove(0))
    }

    async fn delete(store: &MemoryStore, order: &Order) -> RepoResult<Order> {
        let mut written = store
            .apply_order_writes(vec![audited(
                OrderWrite::Delete(order.clone()),
                OrderAuditAction::SystemDeleted,
            )])
            .await?;
        Ok(written.remove(0))
    }

    #[tokio::test]
    async fn test_duplicate_order_rejected_but_guest_allowed() {
        let store = MemoryStore::new();
        let (_, inhabitant, event) = seed(&store);
        create(&store, order_for(&inhabitant, &event)).await.unwrap();
        let err = create(&store, order_for(&inhabitant, &event)).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
        assert_eq!(store.history().len(), 1);

        let mut guest = order_for(&inhabitant, &event);
        guest.is_guest_ticket = true;
        create(&store, guest.clone()).await.unwrap();
        create(&store, guest).await.unwrap();
        assert_eq!(store.orders().len(), 3);
    }

    #[tokio::test]
    async fn test_delete_nulls_transaction_reference_and_keeps_history() {
        let store = MemoryStore::new();
        let (_, inhabitant, event) = seed(&store);
        let order = create(&store, order_for(&inhabitant, &event)).await.unwrap();
        let tx = store
            .create_transaction(TransactionCreate {
                order_id: Some(order.id),
                order_snapshot: "{}".into(),
                amount: 4_500,
            })
            .await
            .unwrap();

        delete(&store, &order).await.unwrap();
        assert!(store.orders().is_empty());

        let txs = store.transactions();
        assert_eq!(txs[0].id, tx.id);
        assert_eq!(txs[0].order_id, None);
        let history = store.history();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|h| h.order_id == Some(order.id)));
    }

    #[tokio::test]
    async fn test_address_lookup_normalizes_whitespace_and_case() {
        let store = MemoryStore::new();
        let (household, _, _) = seed(&store);
        let found = store
            .find_household_by_address(" skråningen 1 ")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, household.id);
        assert!(store.find_household_by_address("Skråningen 2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_injected_failure_after_n_writes() {
        let store = MemoryStore::new();
        let (_, inhabitant, event) = seed(&store);
        store.fail_after_writes(2);
        let order = create(&store, order_for(&inhabitant, &event)).await.unwrap();
        let err = delete(&store, &order).await.unwrap_err();
        assert!(matches!(err, RepoError::Database(_)));
        assert_eq!(store.orders().len(), 1);
        store.clear_failures();
        delete(&store, &order).await.unwrap();
        assert!(store.orders().is_empty());
    }

    #[tokio::test]
    async fn test_order_batch_rolls_back_rows_when_history_fails() {
        let store = MemoryStore::new();
        let (_, inhabitant, event) = seed(&store);
        let order = create(&store, order_for(&inhabitant, &event)).await.unwrap();
        let batch = vec![AuditedOrderWrite {
            write: OrderWrite::Update {
                id: order.id,
                data: OrderUpdate {
                    price_at_booking: Some(2_200),
                    ..Default::default()
                },
            },
            action: OrderAuditAction::SystemPriceUpdated,
            performed_by_user_id: None,
            context: serde_json::json!({}),
        }];

        // the row write succeeds, its history entry fails
        store.fail_after_writes(1);
        let err = store.apply_order_writes(batch.clone()).await.unwrap_err();
        assert!(matches!(err, RepoError::Database(_)));
        assert_eq!(store.orders()[0].price_at_booking, 4_500);
        assert_eq!(store.history().len(), 1);

        store.clear_failures();
        let written = store.apply_order_writes(batch).await.unwrap();
        assert_eq!(written[0].price_at_booking, 2_200);
        let history = store.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].action, OrderAuditAction::SystemPriceUpdated);
        assert_eq!(history[1].order_id, Some(order.id));
    }

    #[tokio::test]
    async fn test_order_batch_delete_keeps_row_snapshot_in_history() {
        let store = MemoryStore::new();
        let (_, inhabitant, event) = seed(&store);
        let order = create(&store, order_for(&inhabitant, &event)).await.unwrap();

        let written = store
            .apply_order_writes(vec![AuditedOrderWrite {
                write: OrderWrite::Delete(order.clone()),
                action: OrderAuditAction::SystemDeleted,
                performed_by_user_id: Some(3),
                context: serde_json::json!({"bucket": "delete"}),
            }])
            .await
            .unwrap();

        assert_eq!(written, vec![order.clone()]);
        assert!(store.orders().is_empty());
        let deleted = store.history().pop().unwrap();
        assert_eq!(deleted.action, OrderAuditAction::SystemDeleted);
        assert_eq!(deleted.order_id, Some(order.id));
        assert_eq!(deleted.inhabitant_id, inhabitant.id);
        assert_eq!(deleted.performed_by_user_id, Some(3));
    }

    #[tokio::test]
    async fn test_billable_orders_skip_cancelled_events() {
        let store = MemoryStore::new();
        let (_, inhabitant, event) = seed(&store);
        let cancelled = store.insert_dinner_event(DinnerEvent {
            id: 0,
            season_id: 1,
            date: date(2025, 3, 6),
            menu_title: "Aflyst".into(),
            menu_description: None,
            total_cost: 0,
            state: DinnerState::Cancelled,
        });
        create(&store, order_for(&inhabitant, &event)).await.unwrap();
        create(&store, order_for(&inhabitant, &cancelled)).await.unwrap();

        let billable = store
            .find_billable_orders(date(2025, 3, 1), date(2025, 3, 31))
            .await
            .unwrap();
        assert_eq!(billable.len(), 1);
        assert_eq!(billable[0].dinner_event_id, event.id);
    }
}
