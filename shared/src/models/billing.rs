//! Transaction, Invoice and Billing Period Summary Models

use crate::types::Timestamp;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Billed fact for one order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: i64,
    /// Weak reference, nulled when the order is deleted
    pub order_id: Option<i64>,
    /// Frozen billing projection (JSON), written once
    pub order_snapshot: String,
    /// Amount in øre
    pub amount: i64,
    pub invoice_id: Option<i64>,
    pub created_at: Timestamp,
}

/// Create transaction payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionCreate {
    pub order_id: Option<i64>,
    pub order_snapshot: String,
    pub amount: i64,
}

/// Invoice - one household's bill for one billing period
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invoice {
    pub id: i64,
    pub billing_period_summary_id: Option<i64>,
    /// Weak reference, nulled when the household is deleted
    pub household_id: Option<i64>,
    /// Frozen at billing time
    pub pbs_id: i64,
    /// Frozen at billing time
    pub address: String,
    /// Stored total in øre
    pub amount: i64,
    /// Label `YYYY-MM-DD_YYYY-MM-DD`
    pub billing_period: String,
    pub cutoff_date: NaiveDate,
    pub payment_date: NaiveDate,
    pub created_at: Timestamp,

    // -- Relations (populated by the repository) --
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

/// Create invoice payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceCreate {
    pub billing_period_summary_id: Option<i64>,
    pub household_id: Option<i64>,
    pub pbs_id: i64,
    pub address: String,
    pub amount: i64,
    pub billing_period: String,
    pub cutoff_date: NaiveDate,
    pub payment_date: NaiveDate,
    pub transaction_ids: Vec<i64>,
}

/// Period-level totals
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BillingPeriodSummary {
    pub id: i64,
    pub billing_period: String,
    pub cutoff_date: NaiveDate,
    pub payment_date: NaiveDate,
    /// Sum of invoice amounts in øre
    pub total_amount: i64,
    pub household_count: i64,
    pub ticket_count: i64,
    pub dinner_count: i64,
    pub created_at: Timestamp,
}

/// Create billing period summary payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BillingPeriodSummaryCreate {
    pub billing_period: String,
    pub cutoff_date: NaiveDate,
    pub payment_date: NaiveDate,
    pub total_amount: i64,
    pub household_count: i64,
    pub ticket_count: i64,
    pub dinner_count: i64,
}
