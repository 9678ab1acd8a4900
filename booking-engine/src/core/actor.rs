//! Who is performing an operation
//!
//! Authentication happens upstream; the engine only receives the resolved
//! caller and checks household ownership against it.

use serde::{Deserialize, Serialize};

use crate::utils::{AppError, AppResult, ErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorRole {
    /// Scheduled jobs
    System,
    Admin,
    /// Ordinary inhabitant acting for their own household
    Member,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Recorded as `performed_by_user_id`; None for the system
    pub user_id: Option<i64>,
    pub household_id: Option<i64>,
    pub role: ActorRole,
}

impl Actor {
    pub fn system() -> Self {
        Self {
            user_id: None,
            household_id: None,
            role: ActorRole::System,
        }
    }

    pub fn admin(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            household_id: None,
            role: ActorRole::Admin,
        }
    }

    pub fn member(user_id: i64, household_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            household_id: Some(household_id),
            role: ActorRole::Member,
        }
    }

    pub fn is_privileged(&self) -> bool {
        matches!(self.role, ActorRole::System | ActorRole::Admin)
    }

    /// Members may only act for their own household
    pub fn ensure_can_act_for(&self, household_id: i64) -> AppResult<()> {
        if self.is_privileged() || self.household_id == Some(household_id) {
            return Ok(());
        }
        Err(AppError::new(ErrorCode::HouseholdNotOwned)
            .with_detail("household_id", household_id))
    }

    /// Season-wide operations
    pub fn ensure_privileged(&self) -> AppResult<()> {
        if self.is_privileged() {
            Ok(())
        } else {
            Err(AppError::new(ErrorCode::AdminRequired))
        }
    }
}
