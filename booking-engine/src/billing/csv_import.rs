//! Payment-service billing CSV (pivot table) parser
//!
//! ```text
//! "",03/03/2025,06/03/2025            <- header: one date per column
//! "Skrænten 1","180,00"               <- address, total in kroner
//! Voksne,1,1                          <- adult tickets per date
//! "Børn (under 12)",1,1               <- child tickets per date
//! ... repeated per household
//! ```
//!
//! Cells follow RFC 4180 quoting. Blank lines are ignored. Every error carries
//! the 1-based line number it was found on.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::util::kroner_to_minor;
use std::str::FromStr;
use thiserror::Error;

use crate::utils::time::parse_dk_date;
use crate::utils::{AppError, ErrorCode};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CsvImportError {
    #[error("CSV input is empty")]
    Empty,

    #[error("Line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("Line {line}, column {column}: '{value}' is not a DD/MM/YYYY date")]
    InvalidDate {
        line: usize,
        column: usize,
        value: String,
    },

    #[error("Line {line}, column {column}: '{value}' is not a number")]
    InvalidNumber {
        line: usize,
        column: usize,
        value: String,
    },
}

impl CsvImportError {
    fn malformed(line: usize, message: impl Into<String>) -> Self {
        CsvImportError::Malformed {
            line,
            message: message.into(),
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            CsvImportError::Empty => None,
            CsvImportError::Malformed { line, .. }
            | CsvImportError::InvalidDate { line, .. }
            | CsvImportError::InvalidNumber { line, .. } => Some(*line),
        }
    }
}

impl From<CsvImportError> for AppError {
    fn from(err: CsvImportError) -> Self {
        let code = match &err {
            CsvImportError::Empty => ErrorCode::CsvEmpty,
            CsvImportError::InvalidDate { .. } => ErrorCode::CsvInvalidDate,
            CsvImportError::Malformed { .. } | CsvImportError::InvalidNumber { .. } => {
                ErrorCode::CsvMalformed
            }
        };
        let line = err.line();
        let app = AppError::with_message(code, err.to_string());
        match line {
            Some(line) => app.with_detail("line", line),
            None => app,
        }
    }
}

/// One household group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedHousehold {
    /// Line of the address row
    pub line: usize,
    pub address: String,
    pub total_minor: i64,
    /// Adult tickets, one entry per header date
    pub adults: Vec<u32>,
    /// Child tickets, one entry per header date
    pub children: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingImport {
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<ImportedHousehold>,
}

impl BillingImport {
    /// Every row needs one adult and one child count per header date
    pub fn check_shape(&self) -> Result<(), CsvImportError> {
        let dates = self.dates.len();
        match self
            .rows
            .iter()
            .find(|r| r.adults.len() != dates || r.children.len() != dates)
        {
            Some(row) => Err(CsvImportError::malformed(
                row.line,
                format!(
                    "expected {} ticket counts per group, found {} adult and {} child",
                    dates,
                    row.adults.len(),
                    row.children.len()
                ),
            )),
            None => Ok(()),
        }
    }

    /// Total tickets across all rows and dates
    pub fn ticket_count(&self) -> u32 {
        self.rows
            .iter()
            .map(|r| r.adults.iter().sum::<u32>() + r.children.iter().sum::<u32>())
            .sum()
    }
}

struct Record {
    line: usize,
    cells: Vec<String>,
}

/// Split into records, honouring quoted commas, quotes and newlines
fn split_records(text: &str) -> Result<Vec<Record>, CsvImportError> {
    let mut records = Vec::new();
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    cell.push('"');
                } else {
                    in_quotes = false;
                }
            }
            ('"', false) => {
                if !cell.trim().is_empty() {
                    return Err(CsvImportError::malformed(line, "quote inside unquoted cell"));
                }
                cell.clear();
                in_quotes = true;
            }
            ('\n', true) => {
                line += 1;
                cell.push('\n');
            }
            (',', false) => cells.push(std::mem::take(&mut cell)),
            ('\r', false) => {}
            ('\n', false) => {
                cells.push(std::mem::take(&mut cell));
                push_record(&mut records, record_line, std::mem::take(&mut cells));
                line += 1;
                record_line = line;
            }
            (c, _) => cell.push(c),
        }
    }
    if in_quotes {
        return Err(CsvImportError::malformed(record_line, "unterminated quoted cell"));
    }
    cells.push(cell);
    push_record(&mut records, record_line, cells);
    Ok(records)
}

fn push_record(records: &mut Vec<Record>, line: usize, mut cells: Vec<String>) {
    while cells.last().is_some_and(|c| c.trim().is_empty()) {
        cells.pop();
    }
    if !cells.is_empty() {
        records.push(Record { line, cells });
    }
}

fn parse_amount(raw: &str, line: usize, column: usize) -> Result<i64, CsvImportError> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches("kr")
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return Ok(0);
    }
    Decimal::from_str(&cleaned)
        .ok()
        .and_then(kroner_to_minor)
        .ok_or_else(|| CsvImportError::InvalidNumber {
            line,
            column,
            value: raw.to_string(),
        })
}

fn parse_counts(record: &Record, width: usize) -> Result<Vec<u32>, CsvImportError> {
    (1..=width)
        .map(|column| {
            let raw = record.cells.get(column).map(|c| c.trim()).unwrap_or("");
            if raw.is_empty() {
                return Ok(0);
            }
            raw.parse::<u32>().map_err(|_| CsvImportError::InvalidNumber {
                line: record.line,
                column: column + 1,
                value: raw.to_string(),
            })
        })
        .collect()
}

/// Parse the billing pivot table
pub fn parse_billing_csv(text: &str) -> Result<BillingImport, CsvImportError> {
    if text.trim().is_empty() {
        return Err(CsvImportError::Empty);
    }
    let records = split_records(text.trim_start_matches('\u{feff}'))?;
    let Some((header, body)) = records.split_first() else {
        return Err(CsvImportError::Empty);
    };

    let dates = header
        .cells
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, raw)| {
            parse_dk_date(raw).ok_or_else(|| CsvImportError::InvalidDate {
                line: header.line,
                column: i + 1,
                value: raw.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if dates.is_empty() {
        return Err(CsvImportError::malformed(header.line, "header has no dates"));
    }

    let mut rows = Vec::with_capacity(body.len() / 3);
    for group in body.chunks(3) {
        let [address_row, adult_row, child_row] = group else {
            return Err(CsvImportError::malformed(
                group[0].line,
                format!("household group has {} rows, expected 3", group.len()),
            ));
        };

        let address = address_row.cells[0].trim();
        if address.is_empty() {
            return Err(CsvImportError::malformed(address_row.line, "missing address"));
        }
        let total_minor = match address_row.cells.get(1) {
            Some(raw) => parse_amount(raw, address_row.line, 2)?,
            None => 0,
        };

        if !adult_row.cells[0].trim().eq_ignore_ascii_case("voksne") {
            return Err(CsvImportError::malformed(
                adult_row.line,
                format!("expected 'Voksne', found '{}'", adult_row.cells[0].trim()),
            ));
        }
        if !child_row.cells[0].trim().to_lowercase().starts_with("børn") {
            return Err(CsvImportError::malformed(
                child_row.line,
                format!("expected 'Børn', found '{}'", child_row.cells[0].trim()),
            ));
        }
        if address.eq_ignore_ascii_case("voksne") || address.to_lowercase().starts_with("børn") {
            return Err(CsvImportError::malformed(address_row.line, "address row missing"));
        }

        rows.push(ImportedHousehold {
            line: address_row.line,
            address: address.to_string(),
            total_minor,
            adults: parse_counts(adult_row, dates.len())?,
            children: parse_counts(child_row, dates.len())?,
        });
    }

    tracing::debug!(dates = dates.len(), households = rows.len(), "Billing CSV parsed");
    Ok(BillingImport { dates, rows })
}
