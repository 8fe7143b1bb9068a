use std::path::PathBuf;

use crate::scheduler::index::{DEFAULT_BUCKET_COUNT, MIN_BUCKET_COUNT};

pub const DEFAULT_STATE_PATH: &str = "state_history/state_history.json";

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Number of chains in the lookup index. Values below the minimum are
    /// raised to it.
    pub bucket_count: usize,
    /// JSON file used by `save`/`load`.
    pub state_path: PathBuf,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            bucket_count: DEFAULT_BUCKET_COUNT,
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
        }
    }
}

impl SchedulerConfig {
    pub fn new(bucket_count: usize, state_path: impl Into<PathBuf>) -> Self {
        Self {
            bucket_count,
            state_path: state_path.into(),
        }
    }

    pub fn with_bucket_count(mut self, bucket_count: usize) -> Self {
        self.bucket_count = bucket_count;
        self
    }

    pub fn with_state_path(mut self, state_path: impl Into<PathBuf>) -> Self {
        self.state_path = state_path.into();
        self
    }

    pub fn effective_bucket_count(&self) -> usize {
        self.bucket_count.max(MIN_BUCKET_COUNT)
    }
}
