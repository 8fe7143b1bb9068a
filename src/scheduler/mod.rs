pub mod engine;
pub mod history;
pub mod index;
pub mod job;
pub mod queue;
pub mod state;
pub mod timestamp;

pub use engine::{JobLocation, Scheduler};
pub use history::JobHistory;
pub use index::JobIndex;
pub use job::{Job, JobId, JobRef, JobStatus};
pub use queue::JobQueue;
pub use state::{SchedulerSnapshot, SnapshotJob};
