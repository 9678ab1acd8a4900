//! Shared enumerations and primitive types
//!
//! Every component that needs a ticket category, order state, dinner mode or job
//! type imports it from here. Wire names are SCREAMING_SNAKE_CASE and match the
//! values stored in the database and in frozen order snapshots.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type (Unix milliseconds)
pub type Timestamp = i64;

/// Ticket category of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketType {
    Adult,
    Child,
    Baby,
}

impl TicketType {
    /// The category treated as adult-equivalent when nothing else resolves
    pub const DEFAULT: TicketType = TicketType::Adult;

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketType::Adult => "ADULT",
            TicketType::Child => "CHILD",
            TicketType::Baby => "BABY",
        }
    }
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an inhabitant takes a dinner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DinnerMode {
    #[serde(rename = "DINEIN")]
    DineIn,
    #[serde(rename = "DINEINLATE")]
    DineInLate,
    #[serde(rename = "TAKEAWAY")]
    Takeaway,
    #[default]
    #[serde(rename = "NONE")]
    None,
}

impl DinnerMode {
    /// True for every mode that means "I want a ticket"
    pub fn is_attending(&self) -> bool {
        !matches!(self, DinnerMode::None)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DinnerMode::DineIn => "DINEIN",
            DinnerMode::DineInLate => "DINEINLATE",
            DinnerMode::Takeaway => "TAKEAWAY",
            DinnerMode::None => "NONE",
        }
    }

    /// Parse the stored wire name
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "DINEIN" | "DINE_IN" => Some(DinnerMode::DineIn),
            "DINEINLATE" | "DINE_IN_LATE" => Some(DinnerMode::DineInLate),
            "TAKEAWAY" => Some(DinnerMode::Takeaway),
            "NONE" => Some(DinnerMode::None),
            _ => None,
        }
    }
}

impl fmt::Display for DinnerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order lifecycle state
///
/// Cancellation before the deadline deletes the row, so there is no CANCELLED state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    #[default]
    Booked,
    Released,
}

/// Dinner event lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DinnerState {
    #[default]
    Scheduled,
    Announced,
    Consumed,
    Cancelled,
}

impl DinnerState {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DinnerState::Cancelled)
    }
}

/// Order audit action (enum, not free text)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderAuditAction {
    // ═══ user initiated ═══
    UserBooked,
    UserCancelled,
    UserClaimed,
    UserModeChanged,
    AdminManualChange,

    // ═══ reconciliation ═══
    SystemCreated,
    SystemModeUpdated,
    SystemReclaimed,
    SystemClaimed,
    SystemReleased,
    SystemDeleted,
    SystemPriceUpdated,

    // ═══ import / billing ═══
    SystemImported,
    SystemTransactionCreated,
}

impl OrderAuditAction {
    /// Actions that express an explicit human decision about one booking
    pub fn is_user_action(&self) -> bool {
        matches!(
            self,
            OrderAuditAction::UserBooked
                | OrderAuditAction::UserCancelled
                | OrderAuditAction::UserClaimed
                | OrderAuditAction::UserModeChanged
                | OrderAuditAction::AdminManualChange
        )
    }
}

impl fmt::Display for OrderAuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Idempotent job kinds recorded in the job-run ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    OrderScaffold,
    MonthlyBilling,
    BillingImport,
}

/// Job-run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Running,
    Success,
    Failed,
}

/// Day of week with the Danish key used in stored preference maps
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WeekDay {
    #[serde(rename = "mandag")]
    Monday,
    #[serde(rename = "tirsdag")]
    Tuesday,
    #[serde(rename = "onsdag")]
    Wednesday,
    #[serde(rename = "torsdag")]
    Thursday,
    #[serde(rename = "fredag")]
    Friday,
    #[serde(rename = "lørdag")]
    Saturday,
    #[serde(rename = "søndag")]
    Sunday,
}

impl WeekDay {
    pub const ALL: [WeekDay; 7] = [
        WeekDay::Monday,
        WeekDay::Tuesday,
        WeekDay::Wednesday,
        WeekDay::Thursday,
        WeekDay::Friday,
        WeekDay::Saturday,
        WeekDay::Sunday,
    ];

    /// Danish storage key
    pub fn key(&self) -> &'static str {
        match self {
            WeekDay::Monday => "mandag",
            WeekDay::Tuesday => "tirsdag",
            WeekDay::Wednesday => "onsdag",
            WeekDay::Thursday => "torsdag",
            WeekDay::Friday => "fredag",
            WeekDay::Saturday => "lørdag",
            WeekDay::Sunday => "søndag",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        WeekDay::ALL.into_iter().find(|d| d.key() == key)
    }

    pub fn of(date: NaiveDate) -> Self {
        date.weekday().into()
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

impl From<Weekday> for WeekDay {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => WeekDay::Monday,
            Weekday::Tue => WeekDay::Tuesday,
            Weekday::Wed => WeekDay::Wednesday,
            Weekday::Thu => WeekDay::Thursday,
            Weekday::Fri => WeekDay::Friday,
            Weekday::Sat => WeekDay::Saturday,
            Weekday::Sun => WeekDay::Sunday,
        }
    }
}
