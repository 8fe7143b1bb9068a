pub mod config;
pub mod error;
pub mod persistence;
pub mod scheduler;
pub mod service;

pub use error::{Result, SchedulerError};
pub use scheduler::{Job, JobId, JobLocation, JobRef, JobStatus, Scheduler};
pub use service::SchedulerService;
