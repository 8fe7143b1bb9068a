use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};
use crate::scheduler::state::SnapshotJob;

/// Caller-supplied job identifier.
pub type JobId = i64;

/// Shared handle to a job. The queue and the index hold clones of the same
/// `Arc` while a job is pending.
pub type JobRef = Arc<Job>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Executed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Executed => write!(f, "executed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(id: JobId) -> Self {
        Self::with_submit_time(id, Utc::now())
    }

    pub fn with_submit_time(id: JobId, submitted_at: DateTime<Utc>) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            submitted_at,
            executed_at: None,
        }
    }

    /// Transition to `Executed`. The execution time is only ever set here.
    pub fn mark_executed(&mut self, executed_at: DateTime<Utc>) {
        self.status = JobStatus::Executed;
        self.executed_at = Some(executed_at);
    }

    pub fn is_executed(&self) -> bool {
        self.status == JobStatus::Executed
    }

    pub fn to_snapshot(&self) -> SnapshotJob {
        SnapshotJob {
            job_id: self.id,
            submit_timestamp: self.submitted_at,
            status: self.status,
            execution_timestamp: self.executed_at,
        }
    }

    /// Reconstruct a job from a snapshot entry, rejecting entries where the
    /// status and execution timestamp disagree.
    pub fn from_snapshot(snap: &SnapshotJob) -> Result<Self> {
        match (snap.status, snap.execution_timestamp) {
            (JobStatus::Queued, Some(_)) => Err(SchedulerError::MalformedState(format!(
                "job {} is queued but has an execution timestamp",
                snap.job_id
            ))),
            (JobStatus::Executed, None) => Err(SchedulerError::MalformedState(format!(
                "job {} is executed but has no execution timestamp",
                snap.job_id
            ))),
            (status, executed_at) => Ok(Self {
                id: snap.job_id,
                status,
                submitted_at: snap.submit_timestamp,
                executed_at,
            }),
        }
    }
}
