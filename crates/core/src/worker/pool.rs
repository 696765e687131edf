//! Fixed-size pool of isolated workers.
//!
//! Each worker owns one [`WorkerContext`] for its whole life, dequeues
//! tasks with a short timeout so it can observe the stop flag, and runs
//! each task inside a fault boundary that catches errors and panics.
//! The work directory is cleared and the maintenance hook invoked after
//! every task, whatever happened.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::WorkerPoolConfig;
use super::pipeline::{PublishedTask, TaskFailure, TaskPipeline};
use crate::metrics;
use crate::queue::{Dequeued, QueueMessage, Task, TaskQueue, TaskReceiver, TaskSender};
use crate::workdir::{MaintenanceHook, WorkDirManager, WorkerContext};

const RECENT_REPORTS: usize = 50;

/// Summary of one finished task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub task_id: String,
    pub item_id: String,
    pub worker: usize,
    /// "published" or the failure kind.
    pub outcome: String,
    pub error: Option<String>,
    pub duration_ms: u64,
    pub finished_at: DateTime<Utc>,
}

/// Pool status for the status endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PoolStatus {
    pub running: bool,
    pub workers: usize,
    pub busy: usize,
    pub processed: u64,
    pub published: u64,
    pub failed: u64,
    pub panics: u64,
    pub queue_depth: usize,
    pub queue_capacity: usize,
    pub recent: Vec<TaskReport>,
}

/// How shutdown went.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolShutdown {
    pub joined: usize,
    pub aborted: usize,
}

#[derive(Default)]
struct PoolStats {
    processed: AtomicU64,
    published: AtomicU64,
    failed: AtomicU64,
    panics: AtomicU64,
    busy: AtomicUsize,
    recent: RwLock<VecDeque<TaskReport>>,
}

pub struct WorkerPool {
    config: WorkerPoolConfig,
    pipeline: Arc<TaskPipeline>,
    maintenance: Arc<dyn MaintenanceHook>,
    sender: TaskSender,
    receiver: TaskReceiver,
    stats: Arc<PoolStats>,

    // Runtime state
    stop: Arc<AtomicBool>,
    running: AtomicBool,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(
        config: WorkerPoolConfig,
        queue: &TaskQueue,
        pipeline: Arc<TaskPipeline>,
        maintenance: Arc<dyn MaintenanceHook>,
    ) -> Self {
        Self {
            config,
            pipeline,
            maintenance,
            sender: queue.sender(),
            receiver: queue.receiver(),
            stats: Arc::new(PoolStats::default()),
            stop: Arc::new(AtomicBool::new(false)),
            running: AtomicBool::new(false),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Share a stop flag with other components.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }

    /// Allocate worker directories and spawn the workers.
    pub async fn start(&self) -> std::io::Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Worker pool already running");
            return Ok(());
        }

        let manager = WorkDirManager::new(&self.config.work_root);
        let mut contexts = Vec::with_capacity(self.config.count);
        for index in 0..self.config.count {
            match manager.allocate(index).await {
                Ok(ctx) => contexts.push(ctx),
                Err(e) => {
                    self.running.store(false, Ordering::SeqCst);
                    return Err(e);
                }
            }
        }

        let mut handles = self.handles.lock().await;
        for ctx in contexts {
            // Leftovers from a previous run.
            if let Err(e) = ctx.clear().await {
                warn!(worker = ctx.index(), error = %e, "Failed to clear stale work directory");
            }
            let worker = Worker {
                ctx,
                pipeline: Arc::clone(&self.pipeline),
                maintenance: Arc::clone(&self.maintenance),
                receiver: self.receiver.clone(),
                stop: Arc::clone(&self.stop),
                stats: Arc::clone(&self.stats),
                dequeue_timeout: self.config.dequeue_timeout(),
            };
            handles.push(tokio::spawn(worker.run()));
        }

        info!(
            workers = self.config.count,
            root = %manager.root().display(),
            "Worker pool started"
        );
        Ok(())
    }

    /// Stop the pool.
    ///
    /// Sets the stop flag, sends one shutdown sentinel per worker and waits
    /// up to the grace period for workers to finish their current task.
    /// Workers still running after that are aborted.
    pub async fn stop(&self) -> PoolShutdown {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Worker pool not running");
            return PoolShutdown::default();
        }

        info!("Stopping worker pool");
        self.stop.store(true, Ordering::SeqCst);

        let mut handles = self.handles.lock().await;
        for _ in 0..handles.len() {
            if let Err(e) = self.sender.send_shutdown(Duration::from_millis(100)).await {
                debug!(error = %e, "Shutdown sentinel not delivered, relying on stop flag");
            }
        }

        let deadline = Instant::now() + self.config.shutdown_grace();
        let mut outcome = PoolShutdown::default();
        for mut handle in handles.drain(..) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, &mut handle).await {
                Ok(_) => outcome.joined += 1,
                Err(_) => {
                    handle.abort();
                    outcome.aborted += 1;
                }
            }
        }

        if outcome.aborted > 0 {
            warn!(aborted = outcome.aborted, "Workers did not finish within the grace period");
        }
        info!(joined = outcome.joined, "Worker pool stopped");
        outcome
    }

    pub async fn status(&self) -> PoolStatus {
        PoolStatus {
            running: self.running.load(Ordering::Relaxed),
            workers: self.config.count,
            busy: self.stats.busy.load(Ordering::Relaxed),
            processed: self.stats.processed.load(Ordering::Relaxed),
            published: self.stats.published.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
            panics: self.stats.panics.load(Ordering::Relaxed),
            queue_depth: self.sender.depth(),
            queue_capacity: self.sender.capacity(),
            recent: self.stats.recent.read().await.iter().cloned().collect(),
        }
    }
}

struct Worker {
    ctx: WorkerContext,
    pipeline: Arc<TaskPipeline>,
    maintenance: Arc<dyn MaintenanceHook>,
    receiver: TaskReceiver,
    stop: Arc<AtomicBool>,
    stats: Arc<PoolStats>,
    dequeue_timeout: Duration,
}

impl Worker {
    async fn run(self) {
        let index = self.ctx.index();
        info!(worker = index, path = %self.ctx.path().display(), "Worker started");

        loop {
            if self.stop.load(Ordering::SeqCst) {
                break;
            }
            match self.receiver.dequeue(self.dequeue_timeout).await {
                Dequeued::TimedOut => continue,
                Dequeued::Closed => break,
                Dequeued::Message(QueueMessage::Shutdown) => {
                    debug!(worker = index, "Received shutdown sentinel");
                    break;
                }
                Dequeued::Message(QueueMessage::Task(task)) => self.process(task).await,
            }
        }

        info!(worker = index, "Worker exited");
    }

    async fn process(&self, task: Task) {
        let index = self.ctx.index();
        let start = Instant::now();
        self.stats.busy.fetch_add(1, Ordering::Relaxed);
        metrics::WORKERS_BUSY.inc();
        info!(
            worker = index,
            task_id = %task.id,
            item_id = task.item.item_id(),
            title = task.item.title(),
            live = task.item.is_live(),
            "Processing task"
        );

        let result = match self.prepare().await {
            Ok(()) => AssertUnwindSafe(self.pipeline.run(&task, self.ctx.path()))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(TaskFailure::Panic(panic_message(panic.as_ref())))),
            Err(e) => Err(TaskFailure::WorkDir(e.to_string())),
        };

        self.record(index, &task, &result, start.elapsed()).await;
        self.cleanup().await;

        self.stats.busy.fetch_sub(1, Ordering::Relaxed);
        metrics::WORKERS_BUSY.dec();
    }

    async fn record(
        &self,
        index: usize,
        task: &Task,
        result: &Result<PublishedTask, TaskFailure>,
        elapsed: Duration,
    ) {
        let (outcome, error) = match result {
            Ok(published) => {
                info!(
                    worker = index,
                    task_id = %task.id,
                    item_id = %published.item_id,
                    title = %published.title,
                    profile = %published.profile,
                    elapsed_secs = elapsed.as_secs(),
                    "Task published"
                );
                self.stats.published.fetch_add(1, Ordering::Relaxed);
                ("published", None)
            }
            Err(failure) => {
                warn!(
                    worker = index,
                    task_id = %task.id,
                    item_id = task.item.item_id(),
                    kind = failure.kind(),
                    error = %failure,
                    "Task failed"
                );
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                if matches!(failure, TaskFailure::Panic(_)) {
                    self.stats.panics.fetch_add(1, Ordering::Relaxed);
                }
                (failure.kind(), Some(failure.to_string()))
            }
        };

        self.stats.processed.fetch_add(1, Ordering::Relaxed);
        metrics::TASK_OUTCOMES.with_label_values(&[outcome]).inc();
        metrics::TASK_DURATION
            .with_label_values(&[outcome])
            .observe(elapsed.as_secs_f64());

        let mut recent = self.stats.recent.write().await;
        if recent.len() == RECENT_REPORTS {
            recent.pop_front();
        }
        recent.push_back(TaskReport {
            task_id: task.id.clone(),
            item_id: task.item.item_id().to_string(),
            worker: index,
            outcome: outcome.to_string(),
            error,
            duration_ms: elapsed.as_millis() as u64,
            finished_at: Utc::now(),
        });
    }

    /// Makes sure the pipeline starts in an empty directory, even when the
    /// previous cleanup left something behind.
    async fn prepare(&self) -> std::io::Result<()> {
        if self.ctx.is_empty().await.unwrap_or(false) {
            return Ok(());
        }
        let removed = self.ctx.clear().await?;
        debug!(worker = self.ctx.index(), removed, "Removed leftovers before task");
        Ok(())
    }

    /// Runs on every exit path; failures are logged and swallowed.
    async fn cleanup(&self) {
        if let Err(e) = self.ctx.clear().await {
            warn!(worker = self.ctx.index(), error = %e, "Failed to clear work directory");
            metrics::CLEANUP_FAILURES.with_label_values(&["workdir"]).inc();
        }
        if let Err(e) = self.maintenance.reclaim().await {
            debug!(hook = self.maintenance.name(), error = %e, "Maintenance hook failed");
            metrics::CLEANUP_FAILURES
                .with_label_values(&["maintenance"])
                .inc();
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
