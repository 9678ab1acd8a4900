//! Seeded in-memory community for tests

use chrono::{NaiveDate, Weekday};
use shared::models::{
    CookingDays, DateRange, DinnerEvent, DinnerPreferences, Household, Inhabitant, Order,
    OrderHistoryCreate, Season, TicketPrice,
};
use shared::types::{DinnerMode, DinnerState, OrderAuditAction, OrderState, TicketType, WeekDay};
use std::sync::Arc;

use super::{BookingRepository, MemoryStore};
use crate::core::Config;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// First date on or after `from` falling on `weekday`
pub fn next_weekday(from: NaiveDate, weekday: Weekday) -> NaiveDate {
    from.iter_days().find(|d| chrono::Datelike::weekday(d) == weekday).unwrap()
}

pub fn every_day(mode: DinnerMode) -> DinnerPreferences {
    DinnerPreferences::uniform(mode)
}

pub fn on_days(days: &[WeekDay], mode: DinnerMode) -> DinnerPreferences {
    days.iter()
        .fold(DinnerPreferences::default(), |prefs, day| prefs.with(*day, mode))
}

pub fn test_config() -> Config {
    Config::with_overrides("Skraaningen", 2, 10)
}

/// One season (2025, Monday and Thursday dinners, deadline 10 days) with a
/// three-row price list
pub struct Community {
    pub store: Arc<MemoryStore>,
    pub season: Season,
    pub adult: TicketPrice,
    pub child: TicketPrice,
    pub baby: TicketPrice,
}

impl Community {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let cooking_days = CookingDays::default()
            .with(WeekDay::Monday, true)
            .with(WeekDay::Thursday, true);
        let season = store.insert_season(Season {
            id: 0,
            short_name: "2025".into(),
            season_dates: DateRange::new(date(2025, 1, 1), date(2025, 12, 31)),
            is_active: true,
            cooking_days,
            holidays: Vec::new(),
            ticket_is_cancellable_days_before: Some(10),
        });
        let price = |ticket_type, price, limit| TicketPrice {
            id: 0,
            season_id: season.id,
            ticket_type,
            price,
            description: None,
            maximum_age_limit: limit,
        };
        let adult = store.insert_ticket_price(price(TicketType::Adult, 4_500, None));
        let child = store.insert_ticket_price(price(TicketType::Child, 2_200, Some(12)));
        let baby = store.insert_ticket_price(price(TicketType::Baby, 0, Some(2)));
        Self {
            store,
            season,
            adult,
            child,
            baby,
        }
    }

    pub fn repo(&self) -> Arc<dyn BookingRepository> {
        self.store.clone()
    }

    pub fn prices(&self) -> Vec<TicketPrice> {
        vec![self.adult.clone(), self.child.clone(), self.baby.clone()]
    }

    pub fn household(&self, pbs_id: i64, address: &str) -> Household {
        self.store.insert_household(Household {
            id: 0,
            heynabo_id: None,
            pbs_id,
            name: format!("Household {}", pbs_id),
            address: address.into(),
        })
    }

    pub fn inhabitant(&self, household: &Household, name: &str, prefs: DinnerPreferences) -> Inhabitant {
        self.store.insert_inhabitant(Inhabitant {
            id: 0,
            household_id: household.id,
            heynabo_id: None,
            name: name.into(),
            last_name: String::new(),
            birth_date: None,
            dinner_preferences: Some(prefs),
            user_id: None,
        })
    }

    pub fn child(
        &self,
        household: &Household,
        name: &str,
        birth_date: NaiveDate,
        prefs: DinnerPreferences,
    ) -> Inhabitant {
        let mut inhabitant = self.inhabitant(household, name, prefs);
        self.store.set_birth_date(inhabitant.id, Some(birth_date));
        inhabitant.birth_date = Some(birth_date);
        inhabitant
    }

    pub fn dinner(&self, date: NaiveDate) -> DinnerEvent {
        self.store.insert_dinner_event(DinnerEvent {
            id: 0,
            season_id: self.season.id,
            date,
            menu_title: format!("Dinner {}", date),
            menu_description: None,
            total_cost: 0,
            state: DinnerState::Scheduled,
        })
    }

    /// Adult-priced order inserted directly
    pub fn order(
        &self,
        inhabitant: &Inhabitant,
        event: &DinnerEvent,
        state: OrderState,
        mode: DinnerMode,
    ) -> Order {
        self.store.insert_order(Order {
            id: 0,
            dinner_event_id: event.id,
            inhabitant_id: inhabitant.id,
            booked_by_user_id: None,
            ticket_price_id: Some(self.adult.id),
            price_at_booking: self.adult.price,
            dinner_mode: mode,
            state,
            is_guest_ticket: false,
            provenance_household_id: None,
            released_at: None,
            created_at: 0,
            updated_at: 0,
        })
    }

    pub fn user_action(&self, inhabitant: &Inhabitant, event: &DinnerEvent, action: OrderAuditAction) {
        self.store.insert_history(OrderHistoryCreate {
            order_id: None,
            inhabitant_id: inhabitant.id,
            dinner_event_id: event.id,
            action,
            performed_by_user_id: Some(1),
            audit_data: "{}".into(),
        });
    }
}
