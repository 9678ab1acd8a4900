//! Job Run Model

use crate::types::{JobStatus, JobType, Timestamp};
use serde::{Deserialize, Serialize};

/// One execution of an idempotent job
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRun {
    pub id: i64,
    pub job_type: JobType,
    pub status: JobStatus,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub duration_ms: Option<i64>,
    /// Serialized result summary (JSON)
    pub result_summary: Option<String>,
    pub error_message: Option<String>,
    /// Who started it (user id, "cron", ...)
    pub triggered_by: Option<String>,
}

impl JobRun {
    pub fn is_finished(&self) -> bool {
        self.status != JobStatus::Running
    }
}
