//! Worker pool: consumers of the task queue.

mod config;
mod pipeline;
mod pool;

pub use config::WorkerPoolConfig;
pub use pipeline::{PublishedTask, TaskFailure, TaskPipeline};
pub use pool::{PoolShutdown, PoolStatus, TaskReport, WorkerPool};
