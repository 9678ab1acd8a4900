//! Idempotent jobs and their run ledger
//!
//! [`run_tracked`] wraps a job future: it opens a ledger entry, awaits the job
//! and closes the entry with the job's summary or its error message. The
//! job's own result is returned unchanged; a ledger failure while closing is
//! logged and never masks it.

pub mod ledger;

pub use ledger::{JobRunLedger, LedgerError, LedgerResult, MemoryLedger};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared::types::JobType;
use std::future::Future;

use crate::billing::{BillingPeriod, BillingService, ImportResult, InvoiceRun, TransactionRun};
use crate::scaffold::ScaffoldResult;
use crate::utils::validation::{MAX_TRIGGER_LEN, validate_required_text};
use crate::utils::AppResult;

/// Condensed outcome of one monthly billing run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyBillingSummary {
    pub billing_period: String,
    pub transactions_created: usize,
    pub invoice_count: usize,
    pub total_amount: i64,
    pub ticket_count: usize,
    pub dinner_count: usize,
}

impl MonthlyBillingSummary {
    pub fn new(transactions: &TransactionRun, invoices: &InvoiceRun) -> Self {
        Self {
            billing_period: invoices.summary.billing_period.clone(),
            transactions_created: transactions.created,
            invoice_count: invoices.invoices.len(),
            total_amount: invoices.summary.total_amount,
            ticket_count: invoices.stats.ticket_count,
            dinner_count: invoices.stats.dinner_count,
        }
    }
}

/// Transactions, then invoices, for one billing period
pub async fn run_monthly_billing(
    service: &BillingService,
    period: &BillingPeriod,
    cutoff_date: NaiveDate,
    payment_date: NaiveDate,
) -> AppResult<MonthlyBillingSummary> {
    let transactions = service.create_transactions(period).await?;
    let invoices = service
        .generate_invoices(period, cutoff_date, payment_date)
        .await?;
    Ok(MonthlyBillingSummary::new(&transactions, &invoices))
}

/// Stored `JobRun.result_summary`, tagged by job kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "jobType",
    content = "result",
    rename_all = "SCREAMING_SNAKE_CASE"
)]
pub enum JobResultSummary {
    OrderScaffold(ScaffoldResult),
    MonthlyBilling(MonthlyBillingSummary),
    BillingImport(ImportResult),
}

impl JobResultSummary {
    pub fn job_type(&self) -> JobType {
        match self {
            JobResultSummary::OrderScaffold(_) => JobType::OrderScaffold,
            JobResultSummary::MonthlyBilling(_) => JobType::MonthlyBilling,
            JobResultSummary::BillingImport(_) => JobType::BillingImport,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// A job result that can be summarized into the ledger
pub trait JobOutcome {
    fn summary(&self) -> JobResultSummary;
}

impl JobOutcome for ScaffoldResult {
    fn summary(&self) -> JobResultSummary {
        JobResultSummary::OrderScaffold(self.clone())
    }
}

impl JobOutcome for MonthlyBillingSummary {
    fn summary(&self) -> JobResultSummary {
        JobResultSummary::MonthlyBilling(self.clone())
    }
}

impl JobOutcome for ImportResult {
    fn summary(&self) -> JobResultSummary {
        JobResultSummary::BillingImport(self.clone())
    }
}

/// Run `job` under a ledger entry of `job_type`
pub async fn run_tracked<L, F, T>(
    ledger: &L,
    job_type: JobType,
    triggered_by: Option<&str>,
    job: F,
) -> AppResult<T>
where
    L: JobRunLedger + ?Sized,
    F: Future<Output = AppResult<T>>,
    T: JobOutcome,
{
    if let Some(trigger) = triggered_by {
        validate_required_text(trigger, "triggered_by", MAX_TRIGGER_LEN)?;
    }
    let run = ledger
        .start(job_type, triggered_by.map(str::to_string))
        .await?;
    tracing::info!(job_run_id = run.id, ?job_type, triggered_by, "Job started");

    let outcome = job.await;
    let closed = match &outcome {
        Ok(result) => ledger.complete(run.id, &result.summary()).await,
        Err(e) => ledger.fail(run.id, &e.to_string()).await,
    };
    match closed {
        Ok(run) => tracing::info!(
            job_run_id = run.id,
            ?job_type,
            status = ?run.status,
            duration_ms = run.duration_ms,
            "Job finished"
        ),
        Err(e) => tracing::error!(job_run_id = run.id, error = %e, "Failed to close job run"),
    }
    outcome
}
