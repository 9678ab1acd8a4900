//! Billing
//!
//! - [`snapshot`]: freezes an order into a transaction and reads it back with
//!   per-field live/snapshot fallback
//! - [`aggregator`]: period statistics replayed from snapshots
//! - [`service`]: transaction creation, invoicing and the CSV order import
//! - [`csv_import`] / [`csv_export`]: the payment-service CSV formats

pub mod aggregator;
pub mod csv_export;
pub mod csv_import;
pub mod service;
pub mod snapshot;

pub use aggregator::{BillingPeriodAggregator, BillingPeriodStats, compute_stats};
pub use csv_export::{export_file_name, export_invoices_csv, write_export};
pub use csv_import::{BillingImport, CsvImportError, ImportedHousehold, parse_billing_csv};
pub use service::{BillingService, ImportResult, InvoiceRun, TransactionRun};
pub use snapshot::{DisplayTransaction, FieldSource, SnapshotError};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::time::parse_date;
use crate::utils::{AppError, AppResult, ErrorCode};

/// Inclusive billing window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BillingPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> AppResult<Self> {
        if start > end {
            return Err(AppError::new(ErrorCode::BillingPeriodInvalid)
                .with_detail("start", start.to_string())
                .with_detail("end", end.to_string()));
        }
        Ok(Self { start, end })
    }

    /// `YYYY-MM-DD_YYYY-MM-DD`
    pub fn label(&self) -> String {
        format!("{}_{}", self.start.format("%Y-%m-%d"), self.end.format("%Y-%m-%d"))
    }

    pub fn parse_label(label: &str) -> AppResult<Self> {
        let (start, end) = label.split_once('_').ok_or_else(|| {
            AppError::new(ErrorCode::BillingPeriodInvalid).with_detail("billing_period", label)
        })?;
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests;
