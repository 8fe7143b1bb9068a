use crate::error::{Result, SchedulerError};
use crate::scheduler::job::{JobId, JobRef};

pub const DEFAULT_BUCKET_COUNT: usize = 53;

/// Smaller tables degenerate into a single chain.
pub const MIN_BUCKET_COUNT: usize = 3;

/// Separate-chaining lookup of pending jobs by id.
///
/// The bucket count is fixed at construction and small relative to the id
/// space, so collisions are routine: every bucket is an unordered chain that
/// is scanned linearly. An id is stored at most once; inserting it again is a
/// [`SchedulerError::DuplicateKey`].
#[derive(Debug)]
pub struct JobIndex {
    buckets: Vec<Vec<JobRef>>,
    len: usize,
}

impl Default for JobIndex {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKET_COUNT)
    }
}

impl JobIndex {
    /// Create an index with `bucket_count` chains, raised to
    /// [`MIN_BUCKET_COUNT`] if smaller.
    pub fn new(bucket_count: usize) -> Self {
        let bucket_count = bucket_count.max(MIN_BUCKET_COUNT);
        Self {
            buckets: vec![Vec::new(); bucket_count],
            len: 0,
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Bucket an id hashes to. Negative ids wrap into range.
    pub fn bucket_for(&self, id: JobId) -> usize {
        // bucket_count is at least MIN_BUCKET_COUNT and far below i64::MAX
        id.rem_euclid(self.buckets.len() as i64) as usize
    }

    pub fn insert(&mut self, job: JobRef) -> Result<()> {
        let idx = self.bucket_for(job.id);
        let bucket = &mut self.buckets[idx];
        if bucket.iter().any(|existing| existing.id == job.id) {
            return Err(SchedulerError::DuplicateKey(job.id));
        }
        bucket.push(job);
        self.len += 1;
        Ok(())
    }

    pub fn search(&self, id: JobId) -> Option<&JobRef> {
        self.buckets[self.bucket_for(id)]
            .iter()
            .find(|job| job.id == id)
    }

    pub fn remove(&mut self, id: JobId) -> Option<JobRef> {
        let idx = self.bucket_for(id);
        let bucket = &mut self.buckets[idx];
        let pos = bucket.iter().position(|job| job.id == id)?;
        self.len -= 1;
        Some(bucket.remove(pos))
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.search(id).is_some()
    }

    /// Ids held in each bucket, in bucket order.
    pub fn buckets(&self) -> Vec<Vec<JobId>> {
        self.buckets
            .iter()
            .map(|bucket| bucket.iter().map(|job| job.id).collect())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
