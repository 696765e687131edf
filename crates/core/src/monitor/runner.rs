//! Polling loop.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::discovery::{Discovery, DiscoveryError};
use crate::metrics;
use crate::queue::{QueueError, Task, TaskSender};

use super::classify::{classify, Classification};
use super::config::MonitorConfig;
use super::registry::{Observation, SourceRegistry};

/// What happened to one source during one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    DiscoveryFailed,
    FirstSeen,
    Unchanged,
    Enqueued,
    Dropped,
    Skipped(&'static str),
    ClassificationFailed,
}

/// Totals for one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollReport {
    pub polled: usize,
    pub discovery_failures: usize,
    pub first_seen: usize,
    pub unchanged: usize,
    pub enqueued: usize,
    pub dropped: usize,
    pub skipped: usize,
    pub classification_failures: usize,
}

impl PollReport {
    fn record(&mut self, outcome: &SourceOutcome) {
        self.polled += 1;
        match outcome {
            SourceOutcome::DiscoveryFailed => self.discovery_failures += 1,
            SourceOutcome::FirstSeen => self.first_seen += 1,
            SourceOutcome::Unchanged => self.unchanged += 1,
            SourceOutcome::Enqueued => self.enqueued += 1,
            SourceOutcome::Dropped => self.dropped += 1,
            SourceOutcome::Skipped(_) => self.skipped += 1,
            SourceOutcome::ClassificationFailed => self.classification_failures += 1,
        }
    }
}

/// Monitor status for the status endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub running: bool,
    pub sources: usize,
    pub tracked_sources: usize,
    pub cycles: u64,
    pub enqueued: u64,
    pub dropped: u64,
    pub skipped: u64,
    pub discovery_failures: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Counters {
    cycles: AtomicU64,
    enqueued: AtomicU64,
    dropped: AtomicU64,
    skipped: AtomicU64,
    discovery_failures: AtomicU64,
}

/// The producer: polls sources and feeds the task queue.
pub struct SourceMonitor {
    config: MonitorConfig,
    discovery: Arc<dyn Discovery>,
    registry: RwLock<SourceRegistry>,
    sender: TaskSender,
    counters: Counters,
    last_cycle_at: RwLock<Option<DateTime<Utc>>>,

    // Runtime state
    running: AtomicBool,
    stop: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl SourceMonitor {
    pub fn new(
        config: MonitorConfig,
        registry: SourceRegistry,
        discovery: Arc<dyn Discovery>,
        sender: TaskSender,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            discovery,
            registry: RwLock::new(registry),
            sender,
            counters: Counters::default(),
            last_cycle_at: RwLock::new(None),
            running: AtomicBool::new(false),
            stop: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Share a stop flag with other components.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    fn stopping(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Run until [`stop`](Self::stop) is called.
    ///
    /// Each cycle polls every source, then sleeps for the poll interval.
    /// The sleep is cut short by shutdown.
    pub async fn run(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Source monitor already running");
            return;
        }
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let sources = self.registry.read().await.len();
        info!(
            sources,
            interval_secs = self.config.poll_interval_secs,
            "Source monitor started"
        );

        while !self.stopping() {
            let report = self.poll_once().await;
            info!(
                polled = report.polled,
                enqueued = report.enqueued,
                discovery_failures = report.discovery_failures,
                "Poll cycle complete"
            );
            if self.stopping() {
                break;
            }
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Source monitor received shutdown signal");
                    break;
                }
                _ = tokio::time::sleep(self.config.poll_interval()) => {}
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("Source monitor stopped");
    }

    /// Request the loop to stop and interrupt its sleep.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
    }

    /// Poll every source once.
    pub async fn poll_once(&self) -> PollReport {
        let sources = self.registry.read().await.sources().to_vec();
        let mut report = PollReport::default();

        for source in &sources {
            if self.stopping() {
                debug!("Stop requested, ending poll cycle early");
                break;
            }
            let outcome = self.poll_source(source).await;
            report.record(&outcome);
        }

        self.counters.cycles.fetch_add(1, Ordering::Relaxed);
        *self.last_cycle_at.write().await = Some(Utc::now());
        metrics::POLL_CYCLES.inc();
        metrics::QUEUE_DEPTH.set(self.sender.depth() as i64);
        report
    }

    /// Poll one source. Never fails; every problem maps to an outcome.
    pub async fn poll_source(&self, source: &str) -> SourceOutcome {
        let entry = match self.with_timeout(self.discovery.latest(source)).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(source, error = %e, "Discovery failed, skipping source this cycle");
                self.counters
                    .discovery_failures
                    .fetch_add(1, Ordering::Relaxed);
                return SourceOutcome::DiscoveryFailed;
            }
        };

        // State advances before classification and enqueue.
        let observation = self.registry.write().await.observe(source, &entry.item_id);
        match observation {
            Observation::First => {
                info!(source, item_id = %entry.item_id, title = %entry.title, "First observation recorded");
                return SourceOutcome::FirstSeen;
            }
            Observation::Unchanged => return SourceOutcome::Unchanged,
            Observation::New { previous } => {
                info!(source, item_id = %entry.item_id, previous = %previous, title = %entry.title, "New item detected");
            }
        }

        let details = match self
            .with_timeout(self.discovery.details(&entry.canonical_url))
            .await
        {
            Ok(details) => details,
            Err(e) => {
                warn!(source, item_id = %entry.item_id, error = %e, "Metadata lookup failed, skipping item");
                return self.skipped_failure();
            }
        };

        let item = match classify(&entry, &details, &self.config) {
            Ok(Classification::Enqueue(item)) => item,
            Ok(skip) => {
                let reason = skip.skip_reason().unwrap_or("unknown");
                info!(source, item_id = %entry.item_id, reason, "Skipping item");
                metrics::ITEMS_SKIPPED.with_label_values(&[reason]).inc();
                self.counters.skipped.fetch_add(1, Ordering::Relaxed);
                return SourceOutcome::Skipped(reason);
            }
            Err(e) => {
                warn!(source, item_id = %entry.item_id, error = %e, "Invalid item, skipping");
                return self.skipped_failure();
            }
        };

        let is_live = item.is_live();
        match self.sender.try_enqueue(Task::new(source, item)) {
            Ok(()) => {
                info!(source, item_id = %entry.item_id, live = is_live, "Enqueued");
                metrics::ITEMS_ENQUEUED.inc();
                self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
                SourceOutcome::Enqueued
            }
            Err(e @ QueueError::Full { .. }) => {
                warn!(source, error = %e, "Queue full, item dropped");
                metrics::ITEMS_DROPPED.inc();
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                SourceOutcome::Dropped
            }
            Err(e) => {
                warn!(source, error = %e, "Enqueue failed, item dropped");
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                SourceOutcome::Dropped
            }
        }
    }

    fn skipped_failure(&self) -> SourceOutcome {
        metrics::ITEMS_SKIPPED
            .with_label_values(&["classification_failed"])
            .inc();
        self.counters.skipped.fetch_add(1, Ordering::Relaxed);
        SourceOutcome::ClassificationFailed
    }

    async fn with_timeout<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, DiscoveryError>>,
    ) -> Result<T, DiscoveryError> {
        let timeout_secs = self.config.discovery_timeout_secs;
        tokio::time::timeout(self.config.discovery_timeout(), fut)
            .await
            .map_err(|_| DiscoveryError::Timeout { timeout_secs })?
    }

    pub async fn last_seen(&self, source: &str) -> Option<String> {
        self.registry
            .read()
            .await
            .last_seen(source)
            .map(String::from)
    }

    pub async fn status(&self) -> MonitorStatus {
        let registry = self.registry.read().await;
        MonitorStatus {
            running: self.running.load(Ordering::Relaxed),
            sources: registry.len(),
            tracked_sources: registry.tracked(),
            cycles: self.counters.cycles.load(Ordering::Relaxed),
            enqueued: self.counters.enqueued.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            skipped: self.counters.skipped.load(Ordering::Relaxed),
            discovery_failures: self.counters.discovery_failures.load(Ordering::Relaxed),
            last_cycle_at: *self.last_cycle_at.read().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::LiveStatus;
    use crate::queue::{Dequeued, QueueMessage, TaskQueue};
    use crate::testing::MockDiscovery;
    use std::time::Duration;

    fn monitor(discovery: Arc<MockDiscovery>, queue: &TaskQueue) -> SourceMonitor {
        SourceMonitor::new(
            MonitorConfig::default(),
            SourceRegistry::new(vec!["src"]),
            discovery,
            queue.sender(),
        )
    }

    #[tokio::test]
    async fn test_first_observation_does_not_enqueue() {
        let discovery = Arc::new(MockDiscovery::new());
        discovery.set_latest("src", "Old", "X").await;
        let queue = TaskQueue::new(4);
        let m = monitor(discovery, &queue);

        assert_eq!(m.poll_source("src").await, SourceOutcome::FirstSeen);
        assert_eq!(m.last_seen("src").await.as_deref(), Some("X"));
        assert_eq!(queue.sender().depth(), 0);
    }

    #[tokio::test]
    async fn test_new_item_enqueued_once() {
        let discovery = Arc::new(MockDiscovery::new());
        discovery.set_latest("src", "Old", "X").await;
        let queue = TaskQueue::new(4);
        let m = monitor(discovery.clone(), &queue);
        m.poll_once().await;

        discovery.set_latest("src", "New", "Y").await;
        discovery.set_details("Y", Some(500), false, LiveStatus::NotLive).await;
        assert_eq!(m.poll_source("src").await, SourceOutcome::Enqueued);
        assert_eq!(m.poll_source("src").await, SourceOutcome::Unchanged);

        match queue.receiver().dequeue(Duration::from_millis(50)).await {
            Dequeued::Message(QueueMessage::Task(task)) => {
                assert_eq!(task.item.item_id(), "Y");
                assert_eq!(task.source, "src");
            }
            other => panic!("unexpected dequeue: {other:?}"),
        }
        assert_eq!(queue.sender().depth(), 0);
    }

    #[tokio::test]
    async fn test_discovery_failure_keeps_state() {
        let discovery = Arc::new(MockDiscovery::new());
        discovery.set_latest("src", "Old", "X").await;
        let queue = TaskQueue::new(4);
        let m = monitor(discovery.clone(), &queue);
        m.poll_once().await;

        discovery.fail_latest("src").await;
        let report = m.poll_once().await;
        assert_eq!(report.discovery_failures, 1);
        assert_eq!(m.last_seen("src").await.as_deref(), Some("X"));
    }

    #[tokio::test]
    async fn test_metadata_failure_still_advances_state() {
        let discovery = Arc::new(MockDiscovery::new());
        discovery.set_latest("src", "Old", "X").await;
        let queue = TaskQueue::new(4);
        let m = monitor(discovery.clone(), &queue);
        m.poll_once().await;

        discovery.set_latest("src", "New", "Y").await;
        discovery.fail_details("Y").await;
        assert_eq!(m.poll_source("src").await, SourceOutcome::ClassificationFailed);
        assert_eq!(m.last_seen("src").await.as_deref(), Some("Y"));
        assert_eq!(m.poll_source("src").await, SourceOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_upcoming_skipped() {
        let discovery = Arc::new(MockDiscovery::new());
        discovery.set_latest("src", "Old", "X").await;
        let queue = TaskQueue::new(4);
        let m = monitor(discovery.clone(), &queue);
        m.poll_once().await;

        discovery.set_latest("src", "Premiere", "Y").await;
        discovery.set_details("Y", None, false, LiveStatus::IsUpcoming).await;
        assert_eq!(m.poll_source("src").await, SourceOutcome::Skipped("upcoming"));
        assert_eq!(queue.sender().depth(), 0);
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let discovery = Arc::new(MockDiscovery::new());
        discovery.set_latest("src", "Old", "X").await;
        let queue = TaskQueue::new(1);
        let m = monitor(discovery.clone(), &queue);
        m.poll_once().await;

        discovery.set_latest("src", "A", "Y").await;
        discovery.set_details("Y", Some(60), false, LiveStatus::NotLive).await;
        assert_eq!(m.poll_source("src").await, SourceOutcome::Enqueued);

        discovery.set_latest("src", "B", "Z").await;
        discovery.set_details("Z", Some(60), false, LiveStatus::NotLive).await;
        assert_eq!(m.poll_source("src").await, SourceOutcome::Dropped);
        // The dropped item is not retried.
        assert_eq!(m.last_seen("src").await.as_deref(), Some("Z"));
        assert_eq!(m.status().await.dropped, 1);
    }

    #[tokio::test]
    async fn test_run_stops_during_sleep() {
        let discovery = Arc::new(MockDiscovery::new());
        discovery.set_latest("src", "Old", "X").await;
        let queue = TaskQueue::new(4);
        let m = Arc::new(monitor(discovery, &queue));

        let runner = Arc::clone(&m);
        let handle = tokio::spawn(async move { runner.run().await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(m.status().await.running);

        m.stop();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("monitor should stop promptly")
            .unwrap();
        assert!(!m.status().await.running);
        assert!(m.status().await.cycles >= 1);
    }
}
