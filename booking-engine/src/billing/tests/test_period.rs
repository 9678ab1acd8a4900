use super::*;

#[test]
fn test_label_round_trip() {
    let period = BillingPeriod::new(date(2025, 1, 18), date(2025, 2, 17)).unwrap();
    assert_eq!(period.label(), "2025-01-18_2025-02-17");
    assert_eq!(period.to_string(), period.label());
    assert_eq!(BillingPeriod::parse_label("2025-01-18_2025-02-17").unwrap(), period);
    assert!(period.contains(date(2025, 2, 17)));
    assert!(!period.contains(date(2025, 2, 18)));
}

#[test]
fn test_reversed_period_rejected() {
    let err = BillingPeriod::new(date(2025, 2, 1), date(2025, 1, 1)).unwrap_err();
    assert_eq!(err.code, ErrorCode::BillingPeriodInvalid);
    assert!(BillingPeriod::parse_label("2025-01-01").is_err());
    assert!(BillingPeriod::parse_label("2025-02-01_2025-01-01").is_err());
}

#[test]
fn test_single_day_period() {
    let day = date(2025, 3, 3);
    let period = BillingPeriod::new(day, day).unwrap();
    assert!(period.contains(day));
    assert_eq!(march().label(), "2025-03-01_2025-03-31");
}
