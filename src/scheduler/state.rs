use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};
use crate::scheduler::job::{JobId, JobStatus};
use crate::scheduler::timestamp;

/// One job as it appears in a state file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotJob {
    pub job_id: JobId,
    #[serde(with = "timestamp")]
    pub submit_timestamp: DateTime<Utc>,
    pub status: JobStatus,
    #[serde(with = "timestamp::option", default)]
    pub execution_timestamp: Option<DateTime<Utc>>,
}

/// Serialized scheduler state: pending jobs in FIFO order and executed jobs
/// in execution order. Either section may be missing from the input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerSnapshot {
    #[serde(default)]
    pub queue: Vec<SnapshotJob>,
    #[serde(default)]
    pub history: Vec<SnapshotJob>,
}

impl SchedulerSnapshot {
    /// Pretty-printed JSON, as written to state files.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode a state file. Any decoding failure is reported as malformed
    /// state.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| SchedulerError::MalformedState(e.to_string()))
    }
}
