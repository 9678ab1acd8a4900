//! Input validation helpers
//!
//! Boundary checks that run before any mutation.

use shared::models::TicketPrice;

use super::{AppError, AppResult, ErrorCode};

// ── Text length limits ──────────────────────────────────────────────

/// Household address
pub const MAX_ADDRESS_LEN: usize = 500;

/// Job trigger labels ("cron", "admin:17", ...)
pub const MAX_TRIGGER_LEN: usize = 100;

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(
            AppError::validation(format!("{field} must not be empty")).with_detail(field, "empty")
        );
    }
    if value.chars().count() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.chars().count()
        ))
        .with_detail(field, "too long"));
    }
    Ok(())
}

// ── Price list ──────────────────────────────────────────────────────

/// Validate a price list for one resolution request
///
/// Returns the season the list belongs to. An empty list is a configuration
/// problem, not something to default around.
pub fn validate_price_list(prices: &[TicketPrice]) -> AppResult<i64> {
    let Some(first) = prices.first() else {
        return Err(AppError::new(ErrorCode::PriceListEmpty));
    };
    let season_id = first.season_id;
    if let Some(other) = prices.iter().find(|p| p.season_id != season_id) {
        return Err(AppError::new(ErrorCode::PriceListMixedSeasons)
            .with_detail("season_id", season_id)
            .with_detail("other_season_id", other.season_id)
            .with_detail("ticket_price_id", other.id));
    }
    if let Some(negative) = prices.iter().find(|p| p.price < 0) {
        return Err(AppError::validation("Ticket price must not be negative")
            .with_detail("ticket_price_id", negative.id));
    }
    Ok(season_id)
}
