//! Payment-service export (one row per invoice)

use chrono::NaiveDate;
use shared::models::Invoice;
use shared::util::minor_to_kroner;
use std::path::{Path, PathBuf};

use super::BillingPeriod;
use crate::utils::time::format_dk_date;
use crate::utils::{AppError, AppResult};

pub const EXPORT_HEADER: &str = "\"Kunde nr\",Adresse,\"Total DKK/måned\",\"Opkrævning periode start\",\"Opkrævning periode slut\",Opgørelsesdato,\"Måltider total\",\"Evt ekstra\",Note";

/// Quote a cell when it holds a separator, quote or line break
fn cell(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// `PBS-Opgørelse-<community>-<billingPeriod>.csv`; path separators in the
/// community name become `_`
pub fn export_file_name(community: &str, period: &BillingPeriod) -> String {
    let community = community.replace(['/', '\\'], "_").replace("..", "_");
    format!("PBS-Opgørelse-{}-{}.csv", community, period.label())
}

/// Render the export; amounts are decimal kroner with two places
pub fn export_invoices_csv(invoices: &[Invoice], period: &BillingPeriod, cutoff: NaiveDate) -> String {
    let start = format_dk_date(period.start);
    let end = format_dk_date(period.end);
    let cutoff = format_dk_date(cutoff);

    let mut out = String::from(EXPORT_HEADER);
    out.push('\n');
    for invoice in invoices {
        let row = [
            invoice.pbs_id.to_string(),
            cell(&invoice.address),
            minor_to_kroner(invoice.amount).to_string(),
            start.clone(),
            end.clone(),
            cutoff.clone(),
            invoice.transactions.len().to_string(),
            String::new(),
            String::new(),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// Write the export into `dir`, returning the file path
pub fn write_export(
    dir: &Path,
    community: &str,
    invoices: &[Invoice],
    period: &BillingPeriod,
    cutoff: NaiveDate,
) -> AppResult<PathBuf> {
    let path = dir.join(export_file_name(community, period));
    std::fs::write(&path, export_invoices_csv(invoices, period, cutoff)).map_err(|e| {
        AppError::internal(format!("Failed to write export: {}", e))
            .with_detail("path", path.display().to_string())
    })?;
    tracing::info!(path = %path.display(), invoices = invoices.len(), "Billing export written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::Transaction;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn invoice(pbs_id: i64, address: &str, amount: i64, tickets: usize) -> Invoice {
        let transactions = (0..tickets)
            .map(|i| Transaction {
                id: i as i64,
                order_id: None,
                order_snapshot: "{}".into(),
                amount: 0,
                invoice_id: Some(1),
                created_at: 0,
            })
            .collect();
        Invoice {
            id: 1,
            billing_period_summary_id: None,
            household_id: None,
            pbs_id,
            address: address.into(),
            amount,
            billing_period: "2025-01-18_2025-02-17".into(),
            cutoff_date: date(2025, 2, 17),
            payment_date: date(2025, 3, 1),
            created_at: 0,
            transactions,
        }
    }

    fn period() -> BillingPeriod {
        BillingPeriod::new(date(2025, 1, 18), date(2025, 2, 17)).unwrap()
    }

    #[test]
    fn test_export_rows() {
        let csv = export_invoices_csv(
            &[invoice(1001, "Skrænten 1", 13_450, 3), invoice(1002, "Skrænten 2, st.", 0, 0)],
            &period(),
            date(2025, 2, 17),
        );
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], EXPORT_HEADER);
        assert_eq!(lines[1], "1001,Skrænten 1,134.50,18/01/2025,17/02/2025,17/02/2025,3,,");
        assert_eq!(
            lines[2],
            "1002,\"Skrænten 2, st.\",0.00,18/01/2025,17/02/2025,17/02/2025,0,,"
        );
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            export_file_name("Skraaningen", &period()),
            "PBS-Opgørelse-Skraaningen-2025-01-18_2025-02-17.csv"
        );
    }

    #[test]
    fn test_file_name_stays_inside_export_dir() {
        let name = export_file_name("../Skraa/ningen\\x", &period());
        assert_eq!(name, "PBS-Opgørelse-__Skraa_ningen_x-2025-01-18_2025-02-17.csv");

        let dir = tempfile::tempdir().unwrap();
        let path = write_export(dir.path(), "../escape", &[], &period(), date(2025, 2, 17)).unwrap();
        assert_eq!(path.parent(), Some(dir.path()));
        assert!(path.exists());
    }

    #[test]
    fn test_write_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_export(
            dir.path(),
            "Skraaningen",
            &[invoice(1001, "Skrænten 1", 4_500, 1)],
            &period(),
            date(2025, 2, 17),
        )
        .unwrap();
        assert!(path.ends_with("PBS-Opgørelse-Skraaningen-2025-01-18_2025-02-17.csv"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(EXPORT_HEADER));
        assert!(content.contains("1001,Skrænten 1,45.00,"));
    }
}
