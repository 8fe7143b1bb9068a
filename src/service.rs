use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::config::SchedulerConfig;
use crate::error::Result;
use crate::persistence;
use crate::scheduler::{JobId, JobLocation, JobRef, Scheduler};

/// Shared handle to one scheduler and its state file.
///
/// Every mutating operation holds the write lock for its whole duration, so
/// other tasks never observe a job that is in the queue but not yet indexed,
/// or half of a restored snapshot. Saves are serialized by their own lock,
/// and each one snapshots the state only after acquiring it, so the file
/// always ends up holding the newest saved state.
#[derive(Debug, Clone)]
pub struct SchedulerService {
    scheduler: Arc<RwLock<Scheduler>>,
    save_lock: Arc<Mutex<()>>,
    state_path: PathBuf,
}

impl SchedulerService {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            scheduler: Arc::new(RwLock::new(Scheduler::from_config(config))),
            save_lock: Arc::new(Mutex::new(())),
            state_path: config.state_path.clone(),
        }
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    pub async fn submit(&self, id: JobId) -> Result<JobRef> {
        self.scheduler.write().await.submit(id)
    }

    pub async fn run_next(&self) -> Option<JobRef> {
        self.scheduler.write().await.run_next()
    }

    pub async fn run_all(&self) -> Vec<JobRef> {
        self.scheduler.write().await.run_all()
    }

    pub async fn find_job(&self, id: JobId) -> Option<(JobLocation, JobRef)> {
        self.scheduler.read().await.find_job(id)
    }

    pub async fn queue_snapshot(&self) -> Vec<JobRef> {
        self.scheduler.read().await.queue_snapshot()
    }

    pub async fn history_snapshot(&self) -> Vec<JobRef> {
        self.scheduler.read().await.history_snapshot()
    }

    pub async fn recent_history(&self, n: usize) -> Vec<JobRef> {
        self.scheduler.read().await.recent_history(n)
    }

    pub async fn index_snapshot(&self) -> Vec<Vec<JobId>> {
        self.scheduler.read().await.index_snapshot()
    }

    /// Write the current state to the state file.
    pub async fn save(&self) -> Result<()> {
        let _saving = self.save_lock.lock().await;
        let snapshot = self.scheduler.read().await.persist();
        persistence::save_snapshot(&self.state_path, &snapshot).await
    }

    /// Replace the current state with the state file's contents.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing, unreadable or malformed; the in-memory
    /// state is left untouched in every failure case.
    pub async fn load(&self) -> Result<()> {
        let snapshot = persistence::load_snapshot(&self.state_path).await?;
        self.scheduler.write().await.restore(snapshot)
    }

    /// Load the state file if there is one. Returns whether anything was
    /// loaded.
    pub async fn load_if_exists(&self) -> Result<bool> {
        match persistence::load_snapshot_if_exists(&self.state_path).await? {
            Some(snapshot) => {
                self.scheduler.write().await.restore(snapshot)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
