//! Ticket Price Resolver
//!
//! Priority (first match wins):
//! 1. birth date present: age at the reference date picks the category whose
//!    exclusive max-age bound is the lowest one above the age; the cheapest row
//!    of that category wins, ties by list order
//! 2. explicit amount: the row with exactly that price
//! 3. the first adult row, else the last row of the list

use chrono::NaiveDate;
use shared::models::{Inhabitant, TicketPrice};
use shared::types::TicketType;

use crate::utils::time::age_in_years;

/// Resolve the applicable price row
///
/// Returns `None` only for an empty list; callers treat that as missing
/// configuration.
pub fn resolve_ticket_price(
    birth_date: Option<NaiveDate>,
    explicit_price: Option<i64>,
    prices: &[TicketPrice],
    reference_date: NaiveDate,
) -> Option<&TicketPrice> {
    if prices.is_empty() {
        return None;
    }

    if let Some(birth) = birth_date
        && let Some(price) = resolve_by_age(age_in_years(birth, reference_date), prices)
    {
        return Some(price);
    }

    if let Some(amount) = explicit_price
        && let Some(price) = resolve_by_price(amount, prices)
    {
        return Some(price);
    }

    default_price(prices)
}

/// Price row for an inhabitant attending a dinner on `event_date`
pub fn resolve_for_inhabitant<'a>(
    inhabitant: &Inhabitant,
    prices: &'a [TicketPrice],
    event_date: NaiveDate,
) -> Option<&'a TicketPrice> {
    resolve_ticket_price(inhabitant.birth_date, None, prices, event_date)
}

/// Category by age, then the cheapest tier inside it
pub fn resolve_by_age(age: u32, prices: &[TicketPrice]) -> Option<&TicketPrice> {
    // Stable sort keeps list order among equal bounds; unbounded rows sort last.
    let mut by_bound: Vec<&TicketPrice> = prices.iter().collect();
    by_bound.sort_by_key(|p| p.maximum_age_limit.unwrap_or(u32::MAX));

    let category = by_bound
        .iter()
        .find(|p| p.maximum_age_limit.is_none_or(|max| age < max))?
        .ticket_type;

    cheapest_in(category, prices)
}

/// Row whose price equals `amount`
pub fn resolve_by_price(amount: i64, prices: &[TicketPrice]) -> Option<&TicketPrice> {
    prices.iter().find(|p| p.price == amount)
}

/// First adult row, else the last row
pub fn default_price(prices: &[TicketPrice]) -> Option<&TicketPrice> {
    prices
        .iter()
        .find(|p| p.ticket_type == TicketType::DEFAULT)
        .or_else(|| prices.last())
}

/// Category of a billed amount, adult when nothing matches
pub fn ticket_type_for_amount(amount: i64, prices: &[TicketPrice]) -> TicketType {
    resolve_by_price(amount, prices)
        .map(|p| p.ticket_type)
        .unwrap_or(TicketType::DEFAULT)
}

fn cheapest_in(category: TicketType, prices: &[TicketPrice]) -> Option<&TicketPrice> {
    // min_by_key returns the last minimum; fold keeps the first.
    prices
        .iter()
        .filter(|p| p.ticket_type == category)
        .fold(None, |best: Option<&TicketPrice>, p| match best {
            Some(b) if b.price <= p.price => Some(b),
            _ => Some(p),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(id: i64, ticket_type: TicketType, amount: i64, max_age: Option<u32>) -> TicketPrice {
        TicketPrice {
            id,
            season_id: 1,
            ticket_type,
            price: amount,
            description: None,
            maximum_age_limit: max_age,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn season_prices() -> Vec<TicketPrice> {
        vec![
            price(1, TicketType::Adult, 4_500, None),
            price(2, TicketType::Child, 2_200, Some(12)),
            price(3, TicketType::Baby, 1_500, Some(2)),
            price(4, TicketType::Baby, 0, Some(2)),
        ]
    }

    #[test]
    fn test_empty_list_has_no_result() {
        assert!(resolve_ticket_price(Some(date(2000, 1, 1)), Some(100), &[], date(2025, 1, 1)).is_none());
    }

    #[test]
    fn test_child_boundary_is_exclusive() {
        let prices = vec![
            price(1, TicketType::Child, 2_200, Some(12)),
            price(2, TicketType::Adult, 4_500, None),
        ];
        assert_eq!(resolve_by_age(11, &prices).unwrap().ticket_type, TicketType::Child);
        assert_eq!(resolve_by_age(12, &prices).unwrap().ticket_type, TicketType::Adult);
    }

    #[test]
    fn test_baby_max_age_two_moves_to_next_category() {
        let prices = season_prices();
        assert_eq!(resolve_by_age(1, &prices).unwrap().ticket_type, TicketType::Baby);
        assert_eq!(resolve_by_age(2, &prices).unwrap().ticket_type, TicketType::Child);
    }

    #[test]
    fn test_cheapest_tier_wins() {
        let prices = season_prices();
        let baby = resolve_by_age(0, &prices).unwrap();
        assert_eq!(baby.id, 4);
        assert_eq!(baby.price, 0);

        let mut reversed = prices.clone();
        reversed.reverse();
        assert_eq!(resolve_by_age(0, &reversed).unwrap().id, 4);
    }

    #[test]
    fn test_equal_price_tie_keeps_list_order() {
        let prices = vec![
            price(7, TicketType::Baby, 0, Some(2)),
            price(8, TicketType::Baby, 0, Some(2)),
            price(9, TicketType::Adult, 4_500, None),
        ];
        assert_eq!(resolve_by_age(1, &prices).unwrap().id, 7);
    }

    #[test]
    fn test_unsorted_input_resolves() {
        let prices = vec![
            price(1, TicketType::Adult, 4_500, None),
            price(2, TicketType::Child, 2_200, Some(12)),
            price(3, TicketType::Baby, 0, Some(2)),
        ];
        assert_eq!(resolve_by_age(5, &prices).unwrap().id, 2);
        assert_eq!(resolve_by_age(40, &prices).unwrap().id, 1);
    }

    #[test]
    fn test_age_computed_at_reference_date() {
        let prices = season_prices();
        let birth = date(2013, 6, 15);
        let before = resolve_ticket_price(Some(birth), None, &prices, date(2025, 6, 14)).unwrap();
        assert_eq!(before.ticket_type, TicketType::Child);
        let after = resolve_ticket_price(Some(birth), None, &prices, date(2025, 6, 15)).unwrap();
        assert_eq!(after.ticket_type, TicketType::Adult);
    }

    #[test]
    fn test_explicit_price_and_fallbacks() {
        let prices = season_prices();
        let hit = resolve_ticket_price(None, Some(2_200), &prices, date(2025, 1, 1)).unwrap();
        assert_eq!(hit.id, 2);
        let miss = resolve_ticket_price(None, Some(999), &prices, date(2025, 1, 1)).unwrap();
        assert_eq!(miss.ticket_type, TicketType::Adult);
        let none = resolve_ticket_price(None, None, &prices, date(2025, 1, 1)).unwrap();
        assert_eq!(none.id, 1);
    }

    #[test]
    fn test_no_adult_falls_back_to_last_row() {
        let prices = vec![
            price(1, TicketType::Baby, 0, Some(2)),
            price(2, TicketType::Child, 2_200, Some(12)),
        ];
        assert_eq!(default_price(&prices).unwrap().id, 2);
        // age above every bound falls through to the default as well
        assert_eq!(resolve_ticket_price(Some(date(1980, 1, 1)), None, &prices, date(2025, 1, 1)).unwrap().id, 2);
    }

    #[test]
    fn test_ticket_type_for_amount_defaults_to_adult() {
        let prices = season_prices();
        assert_eq!(ticket_type_for_amount(2_200, &prices), TicketType::Child);
        assert_eq!(ticket_type_for_amount(123, &prices), TicketType::Adult);
        assert_eq!(ticket_type_for_amount(123, &[]), TicketType::Adult);
    }
}
