//! Core configuration and caller identity

pub mod actor;
pub mod config;

pub use actor::{Actor, ActorRole};
pub use config::Config;
