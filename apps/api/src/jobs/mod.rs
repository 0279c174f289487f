//! Fetch jobs: ids, progress protocol, and the queue pipeline

mod fetch;
mod id;
mod job;
mod pipeline;
mod progress;

pub use fetch::FetchStream;
pub use id::{JobId, JobIdAllocator};
pub use job::{Job, JobStage};
pub use pipeline::{Pipeline, QueueOutcome};
pub use progress::{JobData, ProgressMessage, ProgressSender};
