pub mod job;
pub mod pool;
pub mod retry;

pub use job::{Job, JobOutcome, JobOutput, JobResult, JobStatus, QueuedJob};
pub use pool::{WorkerContext, WorkerPool};
pub use retry::RetryPolicy;
