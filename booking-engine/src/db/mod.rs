//! Repository Module
//!
//! The engine talks to persistence through [`BookingRepository`]: typed reads
//! with explicit filters, audited order batches and single-row billing writes, each
//! assumed transactional per call. [`memory::MemoryStore`] is the in-process
//! implementation.

pub mod memory;
#[cfg(test)]
pub mod fixtures;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use shared::models::{
    BillingPeriodSummary, BillingPeriodSummaryCreate, DinnerEvent, Household, Inhabitant, Invoice,
    InvoiceCreate, Order, OrderCreate, OrderHistory, OrderHistoryCreate, OrderUpdate, Season,
    TicketPrice, Transaction, TransactionCreate,
};
use shared::types::OrderAuditAction;
use std::collections::HashMap;
use thiserror::Error;

use crate::utils::{AppError, ErrorCode};

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::with_message(ErrorCode::NotFound, msg),
            RepoError::Duplicate(msg) => AppError::with_message(ErrorCode::AlreadyExists, msg),
            RepoError::Database(msg) => AppError::database(msg),
            RepoError::Validation(msg) => AppError::validation(msg),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Live relations of a set of transactions, keyed by id
///
/// Any map may lack an entry: the row was deleted after billing.
#[derive(Debug, Clone, Default)]
pub struct TransactionRelations {
    pub orders: HashMap<i64, Order>,
    pub inhabitants: HashMap<i64, Inhabitant>,
    pub households: HashMap<i64, Household>,
    pub dinner_events: HashMap<i64, DinnerEvent>,
    pub prices: HashMap<i64, TicketPrice>,
}

/// Order row change carried by [`AuditedOrderWrite`]
#[derive(Debug, Clone, PartialEq)]
pub enum OrderWrite {
    Create(OrderCreate),
    Update { id: i64, data: OrderUpdate },
    Delete(Order),
}

/// An order write and the history entry recording it
#[derive(Debug, Clone, PartialEq)]
pub struct AuditedOrderWrite {
    pub write: OrderWrite,
    pub action: OrderAuditAction,
    pub performed_by_user_id: Option<i64>,
    pub context: serde_json::Value,
}

/// Persistence collaborator
#[async_trait]
pub trait BookingRepository: Send + Sync {
    // ── Calendar and prices ─────────────────────────────────────────

    async fn find_season(&self, season_id: i64) -> RepoResult<Option<Season>>;

    /// Events of a season dated on or after `from`, ordered by date
    async fn find_dinner_events(&self, season_id: i64, from: NaiveDate)
    -> RepoResult<Vec<DinnerEvent>>;

    async fn find_dinner_events_by_ids(&self, ids: &[i64]) -> RepoResult<Vec<DinnerEvent>>;

    async fn find_dinner_event_by_date(
        &self,
        season_id: i64,
        date: NaiveDate,
    ) -> RepoResult<Option<DinnerEvent>>;

    async fn find_prices_by_season(&self, season_id: i64) -> RepoResult<Vec<TicketPrice>>;

    async fn find_prices_by_ids(&self, ids: &[i64]) -> RepoResult<Vec<TicketPrice>>;

    // ── Households ──────────────────────────────────────────────────

    /// Households by id; an empty slice means all households
    async fn find_households(&self, ids: &[i64]) -> RepoResult<Vec<Household>>;

    /// Exact match after trimming and case folding
    async fn find_household_by_address(&self, address: &str) -> RepoResult<Option<Household>>;

    /// Ordered by inhabitant id
    async fn find_inhabitants_by_households(
        &self,
        household_ids: &[i64],
    ) -> RepoResult<Vec<Inhabitant>>;

    async fn find_inhabitants(&self, ids: &[i64]) -> RepoResult<Vec<Inhabitant>>;

    // ── Orders ──────────────────────────────────────────────────────

    async fn find_order(&self, id: i64) -> RepoResult<Option<Order>>;

    async fn find_orders_by_ids(&self, ids: &[i64]) -> RepoResult<Vec<Order>>;

    /// Orders held by inhabitants of the given households for the given events
    async fn find_orders_by_household_and_events(
        &self,
        household_ids: &[i64],
        event_ids: &[i64],
    ) -> RepoResult<Vec<Order>>;

    /// RELEASED orders of any household for the given events, ordered by id
    async fn find_released_orders_for_events(&self, event_ids: &[i64]) -> RepoResult<Vec<Order>>;

    /// History rows for any (inhabitant, event) in the cross product, oldest first
    async fn find_order_history_for(
        &self,
        inhabitant_ids: &[i64],
        event_ids: &[i64],
    ) -> RepoResult<Vec<OrderHistory>>;

    /// Orders of non-cancelled events dated inside `[start, end]`
    async fn find_billable_orders(&self, start: NaiveDate, end: NaiveDate)
    -> RepoResult<Vec<Order>>;

    async fn append_order_history(&self, entry: OrderHistoryCreate) -> RepoResult<OrderHistory>;

    /// Apply a batch of order writes together with their history rows as one
    /// transaction: either every row and entry lands or none does. Returns the
    /// written orders in input order; a delete returns the row as it was.
    async fn apply_order_writes(&self, writes: Vec<AuditedOrderWrite>) -> RepoResult<Vec<Order>>;

    // ── Billing ─────────────────────────────────────────────────────

    async fn find_transactions_for_orders(&self, order_ids: &[i64])
    -> RepoResult<Vec<Transaction>>;

    /// Transactions not yet attached to an invoice, ordered by id
    async fn find_uninvoiced_transactions(&self) -> RepoResult<Vec<Transaction>>;

    /// Invoices of one billing period, transactions populated
    async fn find_invoices(&self, billing_period: &str) -> RepoResult<Vec<Invoice>>;

    async fn create_transaction(&self, data: TransactionCreate) -> RepoResult<Transaction>;

    /// Creates the invoice and attaches `transaction_ids` to it
    async fn create_invoice(&self, data: InvoiceCreate) -> RepoResult<Invoice>;

    async fn create_billing_period_summary(
        &self,
        data: BillingPeriodSummaryCreate,
    ) -> RepoResult<BillingPeriodSummary>;

    async fn link_invoices_to_summary(&self, summary_id: i64, invoice_ids: &[i64])
    -> RepoResult<()>;

    /// Batch-load whatever live rows still back the given transactions
    async fn load_transaction_relations(
        &self,
        transactions: &[Transaction],
    ) -> RepoResult<TransactionRelations> {
        let order_ids: Vec<i64> = transactions.iter().filter_map(|t| t.order_id).collect();
        let orders = self.find_orders_by_ids(&order_ids).await?;

        let inhabitant_ids: Vec<i64> = orders.iter().map(|o| o.inhabitant_id).collect();
        let event_ids: Vec<i64> = orders.iter().map(|o| o.dinner_event_id).collect();
        let price_ids: Vec<i64> = orders.iter().filter_map(|o| o.ticket_price_id).collect();

        let inhabitants = self.find_inhabitants(&inhabitant_ids).await?;
        let mut household_ids: Vec<i64> = inhabitants.iter().map(|i| i.household_id).collect();
        household_ids.extend(orders.iter().filter_map(|o| o.provenance_household_id));
        household_ids.sort_unstable();
        household_ids.dedup();

        let households = if household_ids.is_empty() {
            Vec::new()
        } else {
            self.find_households(&household_ids).await?
        };
        let dinner_events = self.find_dinner_events_by_ids(&event_ids).await?;
        let prices = self.find_prices_by_ids(&price_ids).await?;

        Ok(TransactionRelations {
            orders: orders.into_iter().map(|o| (o.id, o)).collect(),
            inhabitants: inhabitants.into_iter().map(|i| (i.id, i)).collect(),
            households: households.into_iter().map(|h| (h.id, h)).collect(),
            dinner_events: dinner_events.into_iter().map(|e| (e.id, e)).collect(),
            prices: prices.into_iter().map(|p| (p.id, p)).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_error_maps_to_app_error() {
        let err: AppError = RepoError::NotFound("Order 1".into()).into();
        assert_eq!(err.code, ErrorCode::NotFound);
        let err: AppError = RepoError::Duplicate("Order".into()).into();
        assert_eq!(err.code, ErrorCode::AlreadyExists);
        let err: AppError = RepoError::Database("disk".into()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "disk");
    }
}
