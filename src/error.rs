use thiserror::Error;

use crate::scheduler::JobId;

/// Why a submission was rejected as a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateReason {
    AlreadyQueued,
    AlreadyExecuted,
}

impl std::fmt::Display for DuplicateReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicateReason::AlreadyQueued => write!(f, "already queued"),
            DuplicateReason::AlreadyExecuted => write!(f, "already executed"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Duplicate submission of job {job_id}: {reason}")]
    DuplicateSubmission {
        job_id: JobId,
        reason: DuplicateReason,
    },

    #[error("Duplicate key in job index: {0}")]
    DuplicateKey(JobId),

    #[error("Malformed scheduler state: {0}")]
    MalformedState(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SchedulerError {
    /// True for rejections the caller is expected to report and move past.
    pub fn is_duplicate_submission(&self) -> bool {
        matches!(self, SchedulerError::DuplicateSubmission { .. })
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
