//! Order Scaffolding
//!
//! Reconciles stored orders with standing dinner preferences for a season:
//!
//! - [`plan`]: pure bucketing of (inhabitant, dinner event) pairs
//! - [`engine`]: loads state, applies the plan in batches, writes history
//! - [`ScaffoldResult`]: per-bucket counts
//!
//! Running the engine twice in a row without outside changes is a no-op the
//! second time.

pub mod engine;
pub mod error;
pub mod plan;
pub mod result;

pub use engine::{HouseholdScope, OrderScaffoldEngine, PreparedScaffold, ScaffoldRequest};
pub use error::{ScaffoldError, ScaffoldOutcome};
pub use plan::{ScaffoldPlan, plan_scaffold};
pub use result::{Bucket, ScaffoldResult};

#[cfg(test)]
mod tests;
