//! Ticket Price Resolution
//!
//! Maps an inhabitant (by age) or a historical amount onto a row of the
//! season's price list. Pure functions, no I/O.

pub mod resolver;

pub use resolver::*;
