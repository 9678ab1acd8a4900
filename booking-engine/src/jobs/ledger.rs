//! Job-run ledger
//!
//! Append-only record of job executions. A run is started once and finished
//! once; finished runs are never rewritten.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::models::JobRun;
use shared::types::{JobStatus, JobType};
use shared::util::{now_millis, snowflake_id};
use thiserror::Error;

use super::JobResultSummary;
use crate::utils::{AppError, ErrorCode};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Job run {0} not found")]
    NotFound(i64),

    #[error("Job run {0} already finished")]
    AlreadyFinished(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let run_id = match &err {
            LedgerError::NotFound(id) | LedgerError::AlreadyFinished(id) => Some(*id),
            _ => None,
        };
        let app = AppError::with_message(ErrorCode::JobLedgerError, err.to_string());
        match run_id {
            Some(id) => app.with_detail("job_run_id", id),
            None => app,
        }
    }
}

#[async_trait]
pub trait JobRunLedger: Send + Sync {
    /// Open a RUNNING entry
    async fn start(&self, job_type: JobType, triggered_by: Option<String>) -> LedgerResult<JobRun>;

    /// Close a running entry as SUCCESS with its summary
    async fn complete(&self, id: i64, summary: &JobResultSummary) -> LedgerResult<JobRun>;

    /// Close a running entry as FAILED
    async fn fail(&self, id: i64, error_message: &str) -> LedgerResult<JobRun>;

    async fn find(&self, id: i64) -> LedgerResult<Option<JobRun>>;

    /// Most recent run of a kind, by start time
    async fn latest(&self, job_type: JobType) -> LedgerResult<Option<JobRun>>;
}

/// In-process ledger; run ids are snowflake ids
#[derive(Debug, Default)]
pub struct MemoryLedger {
    runs: Mutex<Vec<JobRun>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> Vec<JobRun> {
        self.runs.lock().clone()
    }

    fn finish(
        &self,
        id: i64,
        status: JobStatus,
        result_summary: Option<String>,
        error_message: Option<String>,
    ) -> LedgerResult<JobRun> {
        let mut runs = self.runs.lock();
        let run = runs
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(LedgerError::NotFound(id))?;
        if run.is_finished() {
            return Err(LedgerError::AlreadyFinished(id));
        }
        let now = now_millis();
        run.status = status;
        run.completed_at = Some(now);
        run.duration_ms = Some((now - run.started_at).max(0));
        run.result_summary = result_summary;
        run.error_message = error_message;
        Ok(run.clone())
    }
}

#[async_trait]
impl JobRunLedger for MemoryLedger {
    async fn start(&self, job_type: JobType, triggered_by: Option<String>) -> LedgerResult<JobRun> {
        let mut runs = self.runs.lock();
        let run = JobRun {
            id: snowflake_id(),
            job_type,
            status: JobStatus::Running,
            started_at: now_millis(),
            completed_at: None,
            duration_ms: None,
            result_summary: None,
            error_message: None,
            triggered_by,
        };
        runs.push(run.clone());
        Ok(run)
    }

    async fn complete(&self, id: i64, summary: &JobResultSummary) -> LedgerResult<JobRun> {
        let json = summary.to_json()?;
        self.finish(id, JobStatus::Success, Some(json), None)
    }

    async fn fail(&self, id: i64, error_message: &str) -> LedgerResult<JobRun> {
        self.finish(id, JobStatus::Failed, None, Some(error_message.to_string()))
    }

    async fn find(&self, id: i64) -> LedgerResult<Option<JobRun>> {
        Ok(self.runs.lock().iter().find(|r| r.id == id).cloned())
    }

    async fn latest(&self, job_type: JobType) -> LedgerResult<Option<JobRun>> {
        Ok(self
            .runs
            .lock()
            .iter()
            .rev()
            .find(|r| r.job_type == job_type)
            .cloned())
    }
}
