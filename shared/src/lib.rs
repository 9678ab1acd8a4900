//! Shared types for the community dinner booking engine
//!
//! Primitive value types, entity records, the billing snapshot projection and
//! the error system. Nothing in this crate performs I/O.

pub mod error;
pub mod models;
pub mod order;
pub mod types;
pub mod util;

// Re-exports
pub use error::{AppError, AppResult, ErrorCode};
pub use serde::{Deserialize, Serialize};
pub use types::*;
