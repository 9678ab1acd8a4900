use super::*;
use shared::types::{OrderAuditAction, TicketType};

#[tokio::test]
async fn test_transactions_created_once_per_order() {
    let billed = Billed::new().with_orders();
    let service = service(&billed.community);

    let run = service.create_transactions(&march()).await.unwrap();
    assert_eq!(run.created, 3);
    assert_eq!(run.amount, 3 * 4_500);
    assert_eq!(run.billing_period, "2025-03-01_2025-03-31");

    let audits = billed
        .community
        .store
        .history()
        .iter()
        .filter(|h| h.action == OrderAuditAction::SystemTransactionCreated)
        .count();
    assert_eq!(audits, 3);

    let again = service.create_transactions(&march()).await.unwrap();
    assert_eq!(again.created, 0);
    assert_eq!(again.already_billed, 3);
    assert_eq!(billed.community.store.transactions().len(), 3);
}

#[tokio::test]
async fn test_transaction_snapshot_freezes_relations() {
    let billed = Billed::new().with_orders();
    let service = service(&billed.community);
    service.create_transactions(&march()).await.unwrap();

    let tx = billed
        .community
        .store
        .transactions()
        .into_iter()
        .find(|t| t.amount == 4_500)
        .unwrap();
    let snapshot = snapshot::parse_snapshot(&tx).unwrap();
    assert_eq!(snapshot.inhabitant.household.pbs_id, 1001);
    assert_eq!(snapshot.inhabitant.household.address, "Skrænten 1");
    assert_eq!(snapshot.ticket_type, Some(TicketType::Adult));
}

#[tokio::test]
async fn test_invoices_group_by_household_and_summarize() {
    let billed = Billed::new().with_orders();
    let service = service(&billed.community);
    service.create_transactions(&march()).await.unwrap();

    let run = service
        .generate_invoices(&march(), date(2025, 3, 31), date(2025, 4, 5))
        .await
        .unwrap();

    assert_eq!(run.invoices.len(), 2);
    let first = run.invoices.iter().find(|i| i.pbs_id == 1001).unwrap();
    assert_eq!(first.household_id, Some(billed.first.id));
    assert_eq!(first.amount, 9_000);
    assert_eq!(first.transactions.len(), 2);
    let second = run.invoices.iter().find(|i| i.pbs_id == 1002).unwrap();
    assert_eq!(second.amount, 4_500);
    assert!(run
        .invoices
        .iter()
        .all(|i| i.billing_period_summary_id == Some(run.summary.id)));

    assert_eq!(run.summary.total_amount, 13_500);
    assert_eq!(run.summary.household_count, 2);
    assert_eq!(run.summary.ticket_count, 3);
    assert_eq!(run.summary.dinner_count, 2);
    assert_eq!(run.stats.count_of(TicketType::Adult), 3);
    assert!(run.stats.invoice_mismatches.is_empty());
    assert_eq!(billed.community.store.summaries().len(), 1);
}

#[tokio::test]
async fn test_period_invoiced_only_once() {
    let billed = Billed::new().with_orders();
    let service = service(&billed.community);
    service.create_transactions(&march()).await.unwrap();
    service
        .generate_invoices(&march(), date(2025, 3, 31), date(2025, 4, 5))
        .await
        .unwrap();

    let err = service
        .generate_invoices(&march(), date(2025, 3, 31), date(2025, 4, 5))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AlreadyExists);
    assert_eq!(
        err.detail("billing_period").and_then(|v| v.as_str()),
        Some("2025-03-01_2025-03-31")
    );
}

#[tokio::test]
async fn test_april_transactions_stay_open_for_next_period() {
    let billed = Billed::new().with_orders();
    let service = service(&billed.community);
    let april = BillingPeriod::new(date(2025, 4, 1), date(2025, 4, 30)).unwrap();
    service.create_transactions(&march()).await.unwrap();
    service.create_transactions(&april).await.unwrap();

    let march = service
        .generate_invoices(&march(), date(2025, 3, 31), date(2025, 4, 5))
        .await
        .unwrap();
    assert_eq!(march.summary.ticket_count, 3);

    let next = service
        .generate_invoices(&april, date(2025, 4, 30), date(2025, 5, 5))
        .await
        .unwrap();
    assert_eq!(next.invoices.len(), 1);
    assert_eq!(next.summary.total_amount, 4_500);
}

#[tokio::test]
async fn test_deleted_household_invoiced_from_snapshot() {
    let billed = Billed::new().with_orders();
    let service = service(&billed.community);
    service.create_transactions(&march()).await.unwrap();
    billed.community.store.remove_household(billed.second.id);

    let run = service
        .generate_invoices(&march(), date(2025, 3, 31), date(2025, 4, 5))
        .await
        .unwrap();

    let orphan = run.invoices.iter().find(|i| i.pbs_id == 1002).unwrap();
    assert_eq!(orphan.household_id, None);
    assert_eq!(orphan.address, "Skrænten 2, st.");
    assert_eq!(orphan.amount, 4_500);
    assert_eq!(run.summary.total_amount, 13_500);
}

#[tokio::test]
async fn test_export_period_writes_one_row_per_invoice() {
    let billed = Billed::new().with_orders();
    let service = service(&billed.community);
    service.create_transactions(&march()).await.unwrap();
    service
        .generate_invoices(&march(), date(2025, 3, 31), date(2025, 4, 5))
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = service
        .export_period(dir.path(), &march(), date(2025, 3, 31))
        .await
        .unwrap();

    let content = std::fs::read_to_string(path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("1001,Skrænten 1,90.00,01/03/2025,31/03/2025,31/03/2025,2"));
    assert!(lines[2].starts_with("1002,\"Skrænten 2, st.\",45.00,"));
}

#[tokio::test]
async fn test_invoice_keeps_address_after_household_moves() {
    let billed = Billed::new().with_orders();
    let service = service(&billed.community);
    service.create_transactions(&march()).await.unwrap();
    service
        .generate_invoices(&march(), date(2025, 3, 31), date(2025, 4, 5))
        .await
        .unwrap();

    let mut moved = billed.first.clone();
    moved.address = "Skrænten 9".into();
    billed.community.store.update_household(moved);

    let dir = tempfile::tempdir().unwrap();
    let path = service
        .export_period(dir.path(), &march(), date(2025, 3, 31))
        .await
        .unwrap();
    let content = std::fs::read_to_string(path).unwrap();
    assert!(content.contains("1001,Skrænten 1,90.00,"));
    assert!(!content.contains("Skrænten 9"));
}
