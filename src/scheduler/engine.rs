use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use crate::config::SchedulerConfig;
use crate::error::{DuplicateReason, Result, SchedulerError};
use crate::scheduler::history::JobHistory;
use crate::scheduler::index::{JobIndex, DEFAULT_BUCKET_COUNT};
use crate::scheduler::job::{Job, JobId, JobRef, JobStatus};
use crate::scheduler::queue::JobQueue;
use crate::scheduler::state::{SchedulerSnapshot, SnapshotJob};

/// Where `find_job` located a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobLocation {
    Queued,
    Executed,
}

impl std::fmt::Display for JobLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobLocation::Queued => write!(f, "queue"),
            JobLocation::Executed => write!(f, "history"),
        }
    }
}

/// Keeps the queue, the lookup index and the history consistent.
///
/// # Invariants
///
/// - Every queued job is in both the queue and the index, and nowhere else.
/// - Every executed job is in the history and its id is in `executed_ids`.
/// - An id is never both indexed and executed, and once executed it stays
///   executed for the lifetime of this scheduler (or until `restore`).
#[derive(Debug)]
pub struct Scheduler {
    queue: JobQueue,
    index: JobIndex,
    history: JobHistory,
    executed_ids: HashSet<JobId>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKET_COUNT)
    }
}

impl Scheduler {
    pub fn new(bucket_count: usize) -> Self {
        Self {
            queue: JobQueue::new(),
            index: JobIndex::new(bucket_count),
            history: JobHistory::new(),
            executed_ids: HashSet::new(),
        }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(config.effective_bucket_count())
    }

    /// Queue a new job with the given id.
    ///
    /// The returned handle is a snapshot: once the job runs, the scheduler's
    /// copy becomes `Executed` but this handle keeps showing it as queued.
    /// Use [`Scheduler::find_job`] to observe the current state.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::DuplicateSubmission`] if the id is pending or
    /// has already been executed.
    pub fn submit(&mut self, id: JobId) -> Result<JobRef> {
        if self.index.contains(id) {
            return Err(SchedulerError::DuplicateSubmission {
                job_id: id,
                reason: DuplicateReason::AlreadyQueued,
            });
        }
        if self.executed_ids.contains(&id) {
            return Err(SchedulerError::DuplicateSubmission {
                job_id: id,
                reason: DuplicateReason::AlreadyExecuted,
            });
        }

        let job = Arc::new(Job::new(id));
        self.index.insert(job.clone())?;
        self.queue.enqueue(job.clone());
        tracing::debug!(job_id = id, queued = self.queue.len(), "Job submitted");
        Ok(job)
    }

    /// Look a job up among pending jobs first, then among executed ones.
    ///
    /// The returned handle is a snapshot of the job at the time of the call.
    pub fn find_job(&self, id: JobId) -> Option<(JobLocation, JobRef)> {
        if let Some(job) = self.index.search(id) {
            return Some((JobLocation::Queued, job.clone()));
        }
        if self.executed_ids.contains(&id) {
            return self
                .history
                .find(id)
                .map(|job| (JobLocation::Executed, job.clone()));
        }
        None
    }

    /// Execute the job at the head of the queue. Returns `None` without
    /// touching any state when nothing is pending.
    pub fn run_next(&mut self) -> Option<JobRef> {
        let mut job = self.queue.dequeue()?;
        let was_indexed = self.index.remove(job.id).is_some();
        debug_assert!(was_indexed, "queued job {} missing from index", job.id);

        // Unique once out of the queue and index, unless a caller still holds
        // an earlier handle; that handle keeps its queued view.
        Arc::make_mut(&mut job).mark_executed(Utc::now());
        self.executed_ids.insert(job.id);
        tracing::debug!(job_id = job.id, queued = self.queue.len(), "Job executed");
        Some(self.history.record(job).clone())
    }

    /// Drain the queue, returning the executed jobs in execution order.
    pub fn run_all(&mut self) -> Vec<JobRef> {
        let mut executed = Vec::with_capacity(self.queue.len());
        while let Some(job) = self.run_next() {
            executed.push(job);
        }
        executed
    }

    pub fn persist(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            queue: self.queue.snapshot().iter().map(|j| j.to_snapshot()).collect(),
            history: self
                .history
                .snapshot()
                .iter()
                .map(|j| j.to_snapshot())
                .collect(),
        }
    }

    /// Replace all state with the contents of `snapshot`.
    ///
    /// Nothing is replaced unless the whole snapshot is valid: every queue
    /// entry must be queued, every history entry executed, and no id may
    /// appear twice.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::MalformedState`] describing the first
    /// offending entry.
    pub fn restore(&mut self, snapshot: SchedulerSnapshot) -> Result<()> {
        let mut queue = JobQueue::new();
        let mut index = JobIndex::new(self.index.bucket_count());
        let mut history = JobHistory::new();
        let mut executed_ids = HashSet::new();

        for entry in &snapshot.queue {
            let job = Arc::new(restored_job(entry, JobStatus::Queued, "queue")?);
            index.insert(job.clone()).map_err(|_| duplicate_entry(entry))?;
            queue.enqueue(job);
        }

        for entry in &snapshot.history {
            let job = restored_job(entry, JobStatus::Executed, "history")?;
            if index.contains(job.id) || !executed_ids.insert(job.id) {
                return Err(duplicate_entry(entry));
            }
            history.record(Arc::new(job));
        }

        self.queue = queue;
        self.index = index;
        self.history = history;
        self.executed_ids = executed_ids;
        tracing::info!(
            queued = self.queue.len(),
            executed = self.history.len(),
            "Scheduler state restored"
        );
        Ok(())
    }

    pub fn queue_snapshot(&self) -> Vec<JobRef> {
        self.queue.snapshot()
    }

    pub fn history_snapshot(&self) -> Vec<JobRef> {
        self.history.snapshot()
    }

    /// Ids held in each index bucket.
    pub fn index_snapshot(&self) -> Vec<Vec<JobId>> {
        self.index.buckets()
    }

    pub fn recent_history(&self, n: usize) -> Vec<JobRef> {
        self.history.last_n(n)
    }

    pub fn peek_next(&self) -> Option<JobRef> {
        self.queue.peek().cloned()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    pub fn executed_count(&self) -> usize {
        self.history.len()
    }

    pub fn bucket_count(&self) -> usize {
        self.index.bucket_count()
    }

    pub fn is_executed(&self, id: JobId) -> bool {
        self.executed_ids.contains(&id)
    }

    pub fn is_queued(&self, id: JobId) -> bool {
        self.index.contains(id)
    }
}

fn restored_job(entry: &SnapshotJob, expected: JobStatus, section: &str) -> Result<Job> {
    if entry.status != expected {
        return Err(SchedulerError::MalformedState(format!(
            "job {} in {} has status {}, expected {}",
            entry.job_id, section, entry.status, expected
        )));
    }
    Job::from_snapshot(entry)
}

fn duplicate_entry(entry: &SnapshotJob) -> SchedulerError {
    SchedulerError::MalformedState(format!("job {} appears more than once", entry.job_id))
}
