//! User order actions (book, cancel, claim, change mode)

pub mod actions;

pub use actions::{CancelOutcome, OrderActions};
