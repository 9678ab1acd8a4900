//! Data models
//!
//! Entity records shared by the engine and its callers.
//! All IDs are `i64`, money is `i64` øre, timestamps are Unix millis.

pub mod billing;
pub mod dinner_event;
pub mod household;
pub mod job_run;
pub mod order;
pub mod preferences;
pub mod season;
pub mod ticket_price;

// Re-exports
pub use billing::*;
pub use dinner_event::*;
pub use household::*;
pub use job_run::*;
pub use order::*;
pub use preferences::*;
pub use season::*;
pub use ticket_price::*;
