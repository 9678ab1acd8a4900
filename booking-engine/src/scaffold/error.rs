use thiserror::Error;

use super::result::{Bucket, ScaffoldResult};
use crate::db::RepoError;
use crate::utils::{AppError, ErrorCode};

/// Reconciliation errors
#[derive(Debug, Error)]
pub enum ScaffoldError {
    /// Rejected before any write (validation, not found, permission)
    #[error(transparent)]
    Rejected(#[from] AppError),

    /// A write failed; `completed` counts every batch that went through
    #[error("Reconciliation of season {season_id} stopped in {bucket} bucket: {source}")]
    PartialApply {
        season_id: i64,
        bucket: Bucket,
        completed: Box<ScaffoldResult>,
        #[source]
        source: RepoError,
    },
}

impl From<RepoError> for ScaffoldError {
    fn from(err: RepoError) -> Self {
        ScaffoldError::Rejected(err.into())
    }
}

impl From<ScaffoldError> for AppError {
    fn from(err: ScaffoldError) -> Self {
        match err {
            ScaffoldError::Rejected(e) => e,
            ScaffoldError::PartialApply {
                season_id,
                bucket,
                completed,
                source,
            } => {
                let completed = serde_json::to_value(&*completed).unwrap_or_default();
                AppError::with_message(
                    ErrorCode::ReconciliationIncomplete,
                    format!("Reconciliation stopped in {} bucket: {}", bucket, source),
                )
                .with_detail("season_id", season_id)
                .with_detail("bucket", bucket.as_str())
                .with_detail("completed", completed)
            }
        }
    }
}

/// Result type for reconciliation
pub type ScaffoldOutcome<T> = Result<T, ScaffoldError>;
