//! Billing period aggregator
//!
//! Folds invoices into period statistics by replaying their transactions'
//! snapshots. Sums come from transaction amounts, never from stored totals, so
//! they serve as a control against `Invoice.amount`.

use serde::{Deserialize, Serialize};
use shared::models::{Invoice, TicketPrice, Transaction};
use shared::types::TicketType;
use std::collections::{BTreeMap, HashSet};

use super::snapshot::parse_snapshot;
use crate::pricing::ticket_type_for_amount;

/// Stored invoice total that disagrees with its transactions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceMismatch {
    pub invoice_id: i64,
    pub stored: i64,
    pub computed: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingPeriodStats {
    /// Distinct dinner events
    pub dinner_count: usize,
    pub ticket_counts_by_type: BTreeMap<TicketType, usize>,
    pub ticket_count: usize,
    /// Sum over invoiced transactions
    pub invoice_sum: i64,
    /// Sum over every transaction seen, invoiced or not
    pub transaction_sum: i64,
    pub invoice_mismatches: Vec<InvoiceMismatch>,
    /// Transactions whose snapshot could not be read
    pub skipped_snapshots: usize,
}

impl BillingPeriodStats {
    pub fn count_of(&self, ticket_type: TicketType) -> usize {
        self.ticket_counts_by_type
            .get(&ticket_type)
            .copied()
            .unwrap_or(0)
    }
}

/// Incremental fold over invoices and loose transactions
pub struct BillingPeriodAggregator<'a> {
    prices: &'a [TicketPrice],
    dinners: HashSet<i64>,
    stats: BillingPeriodStats,
}

impl<'a> BillingPeriodAggregator<'a> {
    /// `prices` resolve a category from the amount when a snapshot has none
    pub fn new(prices: &'a [TicketPrice]) -> Self {
        Self {
            prices,
            dinners: HashSet::new(),
            stats: BillingPeriodStats::default(),
        }
    }

    pub fn add_invoice(&mut self, invoice: &Invoice) {
        let computed: i64 = invoice.transactions.iter().map(|t| t.amount).sum();
        if computed != invoice.amount {
            tracing::warn!(
                invoice_id = invoice.id,
                stored = invoice.amount,
                computed,
                "Invoice total does not match its transactions"
            );
            self.stats.invoice_mismatches.push(InvoiceMismatch {
                invoice_id: invoice.id,
                stored: invoice.amount,
                computed,
            });
        }
        self.stats.invoice_sum += computed;
        for tx in &invoice.transactions {
            self.add_transaction(tx);
        }
    }

    pub fn add_transaction(&mut self, tx: &Transaction) {
        self.stats.transaction_sum += tx.amount;
        let snapshot = match parse_snapshot(tx) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(transaction_id = tx.id, error = %e, "Snapshot skipped in statistics");
                self.stats.skipped_snapshots += 1;
                return;
            }
        };
        self.dinners.insert(snapshot.dinner_event.id);
        let ticket_type = snapshot
            .ticket_type
            .unwrap_or_else(|| ticket_type_for_amount(tx.amount, self.prices));
        *self.stats.ticket_counts_by_type.entry(ticket_type).or_default() += 1;
        self.stats.ticket_count += 1;
    }

    pub fn finish(mut self) -> BillingPeriodStats {
        self.stats.dinner_count = self.dinners.len();
        self.stats
    }
}

/// One-shot fold over a set of invoices
pub fn compute_stats(invoices: &[Invoice], prices: &[TicketPrice]) -> BillingPeriodStats {
    let mut aggregator = BillingPeriodAggregator::new(prices);
    for invoice in invoices {
        aggregator.add_invoice(invoice);
    }
    aggregator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared::order::{DinnerEventSnapshot, HouseholdSnapshot, InhabitantSnapshot, OrderSnapshot};

    fn snapshot(event_id: i64, ticket_type: Option<TicketType>) -> String {
        OrderSnapshot {
            dinner_event: DinnerEventSnapshot {
                id: event_id,
                date: NaiveDate::from_ymd_opt(2025, 1, event_id as u32).unwrap(),
                menu_title: "Menu".into(),
            },
            inhabitant: InhabitantSnapshot {
                id: 1,
                name: "Anna".into(),
                household: HouseholdSnapshot {
                    id: 1,
                    pbs_id: 1001,
                    address: "Skrænten 1".into(),
                },
            },
            ticket_type,
            is_guest_ticket: None,
            provenance_household: None,
        }
        .to_json()
        .unwrap()
    }

    fn tx(id: i64, amount: i64, order_snapshot: String) -> Transaction {
        Transaction {
            id,
            order_id: None,
            order_snapshot,
            amount,
            invoice_id: Some(100),
            created_at: 0,
        }
    }

    fn invoice(amount: i64, transactions: Vec<Transaction>) -> Invoice {
        Invoice {
            id: 100,
            billing_period_summary_id: None,
            household_id: Some(1),
            pbs_id: 1001,
            address: "Skrænten 1".into(),
            amount,
            billing_period: "2025-01-01_2025-01-31".into(),
            cutoff_date: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            payment_date: NaiveDate::from_ymd_opt(2025, 2, 5).unwrap(),
            created_at: 0,
            transactions,
        }
    }

    fn prices() -> Vec<TicketPrice> {
        vec![
            TicketPrice {
                id: 1,
                season_id: 1,
                ticket_type: TicketType::Adult,
                price: 4_500,
                description: None,
                maximum_age_limit: None,
            },
            TicketPrice {
                id: 2,
                season_id: 1,
                ticket_type: TicketType::Child,
                price: 2_200,
                description: None,
                maximum_age_limit: Some(12),
            },
        ]
    }

    #[test]
    fn test_counts_dinners_once_and_tallies_categories() {
        let invoices = vec![invoice(
            8_900,
            vec![
                tx(1, 4_500, snapshot(6, Some(TicketType::Adult))),
                tx(2, 2_200, snapshot(6, Some(TicketType::Child))),
                tx(3, 2_200, snapshot(9, Some(TicketType::Child))),
            ],
        )];

        let stats = compute_stats(&invoices, &prices());

        assert_eq!(stats.dinner_count, 2);
        assert_eq!(stats.ticket_count, 3);
        assert_eq!(stats.count_of(TicketType::Adult), 1);
        assert_eq!(stats.count_of(TicketType::Child), 2);
        assert_eq!(stats.invoice_sum, 8_900);
        assert!(stats.invoice_mismatches.is_empty());
    }

    #[test]
    fn test_missing_category_resolved_from_amount_or_adult() {
        let invoices = vec![invoice(
            9_200,
            vec![
                tx(1, 2_200, snapshot(6, None)),
                tx(2, 7_000, snapshot(6, None)),
            ],
        )];

        let stats = compute_stats(&invoices, &prices());

        assert_eq!(stats.count_of(TicketType::Child), 1);
        assert_eq!(stats.count_of(TicketType::Adult), 1);
        assert_eq!(stats.ticket_count, 2);
    }

    #[test]
    fn test_bad_snapshot_skipped_but_amount_still_summed() {
        let invoices = vec![invoice(
            5_000,
            vec![
                tx(1, 4_500, snapshot(6, Some(TicketType::Adult))),
                tx(2, 2_200, "garbage".into()),
            ],
        )];

        let stats = compute_stats(&invoices, &prices());

        assert_eq!(stats.skipped_snapshots, 1);
        assert_eq!(stats.ticket_count, 1);
        assert_eq!(stats.invoice_sum, 6_700);
        assert_eq!(
            stats.invoice_mismatches,
            vec![InvoiceMismatch {
                invoice_id: 100,
                stored: 5_000,
                computed: 6_700,
            }]
        );
    }

    #[test]
    fn test_loose_transactions_only_count_toward_transaction_sum() {
        let prices = prices();
        let mut aggregator = BillingPeriodAggregator::new(&prices);
        aggregator.add_invoice(&invoice(4_500, vec![tx(1, 4_500, snapshot(6, None))]));
        aggregator.add_transaction(&tx(2, 2_200, snapshot(9, Some(TicketType::Child))));
        let stats = aggregator.finish();

        assert_eq!(stats.invoice_sum, 4_500);
        assert_eq!(stats.transaction_sum, 6_700);
        assert_eq!(stats.dinner_count, 2);
    }
}
