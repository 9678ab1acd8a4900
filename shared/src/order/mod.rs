//! Order billing projections

pub mod snapshot;

pub use snapshot::{DinnerEventSnapshot, HouseholdSnapshot, InhabitantSnapshot, OrderSnapshot};
