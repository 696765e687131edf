//! Source monitor: the producer side of the pipeline.
//!
//! Polls every registered source on a fixed cycle, tracks the last item
//! seen per source, classifies new items and enqueues them without ever
//! blocking on the queue.

mod classify;
mod config;
mod registry;
mod runner;

pub use classify::{classify, Classification};
pub use config::MonitorConfig;
pub use registry::{Observation, SourceRegistry};
pub use runner::{MonitorStatus, PollReport, SourceMonitor, SourceOutcome};
