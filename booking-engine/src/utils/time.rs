//! Date helpers: business-time-zone "today", ages and cancellation deadlines
//!
//! Everything here works on calendar dates (`NaiveDate`). Conversion from an
//! instant to a date happens once, via [`today_in`].

use chrono::{Datelike, Duration, NaiveDate};
use chrono_tz::Tz;

use super::{AppError, AppResult};

/// Parse an ISO date (YYYY-MM-DD)
pub fn parse_date(date: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid date format: {}", date)))
}

/// Parse a Danish-format date (DD/MM/YYYY)
pub fn parse_dk_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%d/%m/%Y").ok()
}

/// Format as DD/MM/YYYY
pub fn format_dk_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Today in the business time zone
pub fn today_in(tz: Tz) -> NaiveDate {
    chrono::Utc::now().with_timezone(&tz).date_naive()
}

/// Age in completed years at `at`
///
/// A birthday not yet reached in `at`'s year subtracts one. A birth date after
/// `at` yields 0.
pub fn age_in_years(birth_date: NaiveDate, at: NaiveDate) -> u32 {
    let mut years = at.year() - birth_date.year();
    if (at.month(), at.day()) < (birth_date.month(), birth_date.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

/// Last date on which removal is still a hard delete: `event_date - days`
pub fn cancellation_cutoff(event_date: NaiveDate, days_before: i64) -> NaiveDate {
    event_date - Duration::days(days_before)
}

/// True while `today` is strictly before the cutoff
///
/// On the cutoff day itself the deadline has passed.
pub fn is_before_deadline(today: NaiveDate, event_date: NaiveDate, days_before: i64) -> bool {
    today < cancellation_cutoff(event_date, days_before)
}
