//! Worker pool configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the worker pool (the `[workers]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerPoolConfig {
    /// Number of concurrent workers.
    #[serde(default = "default_count")]
    pub count: usize,

    /// Maximum tasks waiting in the queue. Further items are dropped.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Parent of the per-worker directories (`<root>/worker-<idx>`).
    #[serde(default = "default_work_root")]
    pub work_root: PathBuf,

    /// How long one dequeue attempt waits before re-checking the stop flag.
    #[serde(default = "default_dequeue_timeout")]
    pub dequeue_timeout_ms: u64,

    /// How long shutdown waits for in-flight tasks before aborting workers.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,

    /// Upper bound for the enrichment step of one task.
    #[serde(default = "default_enrichment_timeout")]
    pub enrichment_timeout_secs: u64,

    /// Upper bound for the translation step of one task.
    #[serde(default = "default_translation_timeout")]
    pub translation_timeout_secs: u64,
}

fn default_count() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cpus / 2).max(2)
}

fn default_queue_capacity() -> usize {
    200
}

fn default_work_root() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_dequeue_timeout() -> u64 {
    1000 // 1 second
}

fn default_shutdown_grace() -> u64 {
    10
}

fn default_enrichment_timeout() -> u64 {
    180
}

fn default_translation_timeout() -> u64 {
    300
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
            queue_capacity: default_queue_capacity(),
            work_root: default_work_root(),
            dequeue_timeout_ms: default_dequeue_timeout(),
            shutdown_grace_secs: default_shutdown_grace(),
            enrichment_timeout_secs: default_enrichment_timeout(),
            translation_timeout_secs: default_translation_timeout(),
        }
    }
}

impl WorkerPoolConfig {
    pub fn dequeue_timeout(&self) -> Duration {
        Duration::from_millis(self.dequeue_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = root.into();
        self
    }

    pub fn with_dequeue_timeout_ms(mut self, ms: u64) -> Self {
        self.dequeue_timeout_ms = ms;
        self
    }

    pub fn with_shutdown_grace_secs(mut self, secs: u64) -> Self {
        self.shutdown_grace_secs = secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WorkerPoolConfig::default();
        assert!(config.count >= 2);
        assert_eq!(config.queue_capacity, 200);
        assert_eq!(config.work_root, PathBuf::from("downloads"));
        assert_eq!(config.dequeue_timeout(), Duration::from_secs(1));
        assert_eq!(config.shutdown_grace(), Duration::from_secs(10));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: WorkerPoolConfig = toml::from_str("count = 3\nwork_root = \"/tmp/w\"").unwrap();
        assert_eq!(config.count, 3);
        assert_eq!(config.work_root, PathBuf::from("/tmp/w"));
        assert_eq!(config.queue_capacity, 200);
    }
}
