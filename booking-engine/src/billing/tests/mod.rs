use super::*;
use crate::db::fixtures::*;
use shared::models::{DinnerEvent, Household, Inhabitant};
use shared::types::{DinnerMode, OrderState};

fn march() -> BillingPeriod {
    BillingPeriod::new(date(2025, 3, 1), date(2025, 3, 31)).unwrap()
}

fn service(community: &Community) -> BillingService {
    BillingService::new(community.repo(), test_config())
}

/// Two households, two March dinners and one in April
struct Billed {
    community: Community,
    first: Household,
    second: Household,
    anna: Inhabitant,
    bo: Inhabitant,
    carl: Inhabitant,
    monday: DinnerEvent,
    thursday: DinnerEvent,
    april: DinnerEvent,
}

impl Billed {
    fn new() -> Self {
        let community = Community::new();
        let first = community.household(1001, "Skrænten 1");
        let second = community.household(1002, "Skrænten 2, st.");
        let anna = community.inhabitant(&first, "Anna", every_day(DinnerMode::DineIn));
        let bo = community.child(&first, "Bo", date(2018, 5, 1), every_day(DinnerMode::DineIn));
        let carl = community.inhabitant(&second, "Carl", every_day(DinnerMode::DineIn));
        let monday = community.dinner(date(2025, 3, 3));
        let thursday = community.dinner(date(2025, 3, 6));
        let april = community.dinner(date(2025, 4, 3));
        Self {
            community,
            first,
            second,
            anna,
            bo,
            carl,
            monday,
            thursday,
            april,
        }
    }

    /// Anna twice, Carl once in March, Anna once in April
    fn with_orders(self) -> Self {
        let c = &self.community;
        c.order(&self.anna, &self.monday, OrderState::Booked, DinnerMode::DineIn);
        c.order(&self.anna, &self.thursday, OrderState::Booked, DinnerMode::Takeaway);
        c.order(&self.carl, &self.thursday, OrderState::Released, DinnerMode::DineIn);
        c.order(&self.anna, &self.april, OrderState::Booked, DinnerMode::DineIn);
        self
    }
}

mod test_invoices;
mod test_period;
