//! Utilities: logging, dates, boundary validation
//!
//! Error types are re-exported from `shared::error` so engine modules import
//! them from one place.

pub mod logger;
pub mod time;
pub mod validation;

pub use shared::error::{AppError, AppResult, ErrorCategory, ErrorCode};
