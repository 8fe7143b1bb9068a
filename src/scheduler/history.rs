use crate::scheduler::job::{JobId, JobRef};

/// Append-only record of executed jobs, in execution order.
#[derive(Debug, Default)]
pub struct JobHistory {
    jobs: Vec<JobRef>,
}

impl JobHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an executed job and return the stored entry.
    pub fn record(&mut self, job: JobRef) -> &JobRef {
        self.jobs.push(job);
        &self.jobs[self.jobs.len() - 1]
    }

    pub fn find(&self, id: JobId) -> Option<&JobRef> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// All executed jobs, oldest first.
    pub fn snapshot(&self) -> Vec<JobRef> {
        self.jobs.clone()
    }

    /// Up to `n` most recently executed jobs, oldest of that window first.
    pub fn last_n(&self, n: usize) -> Vec<JobRef> {
        let start = self.jobs.len().saturating_sub(n);
        self.jobs[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
