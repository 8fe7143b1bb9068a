use std::collections::VecDeque;

use crate::scheduler::job::{JobId, JobRef};

/// FIFO of jobs waiting to run.
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: VecDeque<JobRef>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job at the tail.
    pub fn enqueue(&mut self, job: JobRef) {
        self.jobs.push_back(job);
    }

    /// Remove and return the head, or `None` when nothing is pending.
    pub fn dequeue(&mut self) -> Option<JobRef> {
        self.jobs.pop_front()
    }

    /// Head of the queue without removing it
    pub fn peek(&self) -> Option<&JobRef> {
        self.jobs.front()
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.jobs.iter().any(|j| j.id == id)
    }

    /// Current contents, head to tail.
    pub fn snapshot(&self) -> Vec<JobRef> {
        self.jobs.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
