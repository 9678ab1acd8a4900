//! Season Model

use super::preferences::CookingDays;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Inclusive date range
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Season - a bounded period with its own calendar and price list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Season {
    pub id: i64,
    pub short_name: String,
    pub season_dates: DateRange,
    pub is_active: bool,
    pub cooking_days: CookingDays,
    #[serde(default)]
    pub holidays: Vec<DateRange>,
    /// Cancellation deadline N (days before the dinner); None = configured default
    pub ticket_is_cancellable_days_before: Option<i64>,
}

impl Season {
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.iter().any(|h| h.contains(date))
    }

    /// Inside the season, on a cooking weekday and outside every holiday
    pub fn is_cooking_date(&self, date: NaiveDate) -> bool {
        self.season_dates.contains(date) && self.cooking_days.for_date(date) && !self.is_holiday(date)
    }

    /// All cooking dates of the season in order
    pub fn cooking_dates(&self) -> Vec<NaiveDate> {
        self.season_dates
            .start
            .iter_days()
            .take_while(|d| *d <= self.season_dates.end)
            .filter(|d| self.is_cooking_date(*d))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WeekDay;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_season() -> Season {
        Season {
            id: 1,
            short_name: "24/25".to_string(),
            season_dates: DateRange::new(date(2025, 1, 1), date(2025, 1, 31)),
            is_active: true,
            cooking_days: CookingDays::default()
                .with(WeekDay::Monday, true)
                .with(WeekDay::Thursday, true),
            holidays: vec![DateRange::new(date(2025, 1, 13), date(2025, 1, 19))],
            ticket_is_cancellable_days_before: Some(10),
        }
    }

    #[test]
    fn test_cooking_date_rules() {
        let season = make_season();
        // Monday inside the season
        assert!(season.is_cooking_date(date(2025, 1, 6)));
        // Tuesday is not a cooking day
        assert!(!season.is_cooking_date(date(2025, 1, 7)));
        // Monday in the holiday week
        assert!(!season.is_cooking_date(date(2025, 1, 13)));
        // Monday after the season
        assert!(!season.is_cooking_date(date(2025, 2, 3)));
    }

    #[test]
    fn test_cooking_dates_expand_calendar() {
        let dates = make_season().cooking_dates();
        // Jan 2025: Mondays 6,13,20,27 + Thursdays 2,9,16,23,30, minus 13 and 16
        assert_eq!(dates.len(), 7);
        assert_eq!(dates.first(), Some(&date(2025, 1, 2)));
        assert_eq!(dates.last(), Some(&date(2025, 1, 30)));
    }
}
