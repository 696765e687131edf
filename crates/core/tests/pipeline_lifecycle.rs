//! Worker pool lifecycle integration tests.
//!
//! These tests run the whole consumer side with mock collaborators:
//! - Profile ladder selection and publishing
//! - Frame-overflow and live-cap failures
//! - Work directory hygiene after every task
//! - Panic containment and shutdown

use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use mirror_core::{
    acquisition::{AcquisitionConfig, AcquisitionProtocol, LiveCaptureBridge},
    testing::{
        fixtures, MockEnricher, MockInspector, MockPublisher, MockTranslator, MockTransport,
        RecordingMaintenance,
    },
    PoolStatus, Task, TaskPipeline, TaskQueue, WorkerPool, WorkerPoolConfig,
};

/// Test helper wiring a worker pool to mocks.
struct TestHarness {
    pool: WorkerPool,
    queue: TaskQueue,
    transport: Arc<MockTransport>,
    inspector: Arc<MockInspector>,
    translator: Arc<MockTranslator>,
    publisher: Arc<MockPublisher>,
    maintenance: Arc<RecordingMaintenance>,
    work_root: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self::with(1, 5, RecordingMaintenance::new())
    }

    fn with(workers: usize, grace_secs: u64, maintenance: RecordingMaintenance) -> Self {
        let work_root = TempDir::new().expect("Failed to create work root");
        let transport = Arc::new(MockTransport::new());
        let inspector = Arc::new(MockInspector::new());
        let translator = Arc::new(MockTranslator::new());
        let publisher = Arc::new(MockPublisher::new());
        let maintenance = Arc::new(maintenance);

        let protocol = Arc::new(AcquisitionProtocol::new(
            transport.clone(),
            inspector.clone(),
            AcquisitionConfig::default(),
        ));
        let pipeline = Arc::new(TaskPipeline::new(
            Arc::new(LiveCaptureBridge::new(protocol)),
            Arc::new(MockEnricher::new()),
            translator.clone(),
            publisher.clone(),
        ));

        let config = WorkerPoolConfig::default()
            .with_count(workers)
            .with_work_root(work_root.path())
            .with_dequeue_timeout_ms(50)
            .with_shutdown_grace_secs(grace_secs);
        let queue = TaskQueue::new(config.queue_capacity);
        let pool = WorkerPool::new(config, &queue, pipeline, maintenance.clone());

        Self {
            pool,
            queue,
            transport,
            inspector,
            translator,
            publisher,
            maintenance,
            work_root,
        }
    }

    fn enqueue(&self, task: Task) {
        self.queue
            .sender()
            .try_enqueue(task)
            .expect("Failed to enqueue task");
    }

    /// Wait until `n` tasks finished and no worker is mid-cleanup.
    async fn wait_for_processed(&self, n: u64) -> PoolStatus {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let status = self.pool.status().await;
            if status.processed >= n && status.busy == 0 {
                return status;
            }
            assert!(
                Instant::now() < deadline,
                "timed out waiting for {} processed tasks, status: {:?}",
                n,
                status
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    async fn wait_until_busy(&self) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while self.pool.status().await.busy == 0 {
            assert!(Instant::now() < deadline, "no worker picked up the task");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    fn worker_dir_entries(&self, index: usize) -> usize {
        std::fs::read_dir(self.work_root.path().join(format!("worker-{}", index)))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

#[tokio::test]
async fn test_task_published_with_first_hd_profile() {
    let h = TestHarness::new();
    h.transport
        .set_probe("web", fixtures::probe_with_height("abc123", 360))
        .await;
    h.transport
        .set_probe("android", fixtures::probe_with_height("abc123", 1080))
        .await;
    h.translator.set_answer("中文标题", "动画,搬运", 24).await;

    h.pool.start().await.unwrap();
    h.enqueue(Task::new("src", fixtures::finite_item("abc123")));
    let status = h.wait_for_processed(1).await;

    assert_eq!(status.published, 1);
    assert_eq!(status.failed, 0);
    assert_eq!(status.recent[0].outcome, "published");
    assert_eq!(h.transport.probe_calls().await, vec!["web", "android"]);
    assert_eq!(h.transport.download_calls().await, vec!["android"]);

    let requests = h.publisher.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].title, "中文标题");
    assert_eq!(requests[0].tags, "动画,搬运");
    assert_eq!(requests[0].category_id, 24);
    assert_eq!(requests[0].description, "description of abc123");
    assert!(requests[0].cover_path.is_some());

    assert_eq!(h.translator.calls().await[0].0, "title abc123");
    assert_eq!(h.worker_dir_entries(0), 0);
    assert_eq!(h.maintenance.calls(), 1);

    h.pool.stop().await;
}

#[tokio::test]
async fn test_frame_overflow_fails_without_publishing() {
    let h = TestHarness::new();
    h.inspector.set_frame_count(250_000).await;

    h.pool.start().await.unwrap();
    h.enqueue(Task::new("src", fixtures::finite_item("big")));
    let status = h.wait_for_processed(1).await;

    assert_eq!(status.failed, 1);
    assert_eq!(status.recent[0].outcome, "frame_overflow");
    assert!(h.publisher.requests().await.is_empty());
    assert!(h.translator.calls().await.is_empty());
    assert_eq!(h.worker_dir_entries(0), 0);
    assert_eq!(h.maintenance.calls(), 1);

    h.pool.stop().await;
}

#[tokio::test]
async fn test_live_capture_aborts_at_cap() {
    let h = TestHarness::new();
    h.transport
        .set_live_ticks(vec![
            Duration::ZERO,
            Duration::from_secs(900),
            Duration::from_secs(1800),
        ])
        .await;

    h.pool.start().await.unwrap();
    h.enqueue(Task::new("src", fixtures::live_item("live1", 1800)));
    let status = h.wait_for_processed(1).await;

    assert_eq!(status.recent[0].outcome, "live_aborted");
    // an abort is final, no other profile is tried
    assert_eq!(h.transport.download_calls().await.len(), 1);
    let options = h.transport.download_options().await;
    assert_eq!(options[0].live_window, Some(Duration::from_secs(1800)));
    assert!(h.publisher.requests().await.is_empty());
    assert_eq!(h.worker_dir_entries(0), 0);

    h.pool.stop().await;
}

#[tokio::test]
async fn test_live_capture_finishing_before_cap_publishes() {
    let h = TestHarness::new();
    h.transport
        .set_live_ticks(vec![Duration::ZERO, Duration::from_secs(600)])
        .await;

    h.pool.start().await.unwrap();
    h.enqueue(Task::new("src", fixtures::live_item("live2", 1800)));
    let status = h.wait_for_processed(1).await;

    assert_eq!(status.published, 1);
    assert_eq!(h.publisher.requests().await.len(), 1);
    assert_eq!(h.worker_dir_entries(0), 0);

    h.pool.stop().await;
}

#[tokio::test]
async fn test_panic_is_contained_and_worker_survives() {
    let h = TestHarness::new();
    h.publisher.set_panic(true).await;

    h.pool.start().await.unwrap();
    h.enqueue(Task::new("src", fixtures::finite_item("first")));
    let status = h.wait_for_processed(1).await;

    assert_eq!(status.panics, 1);
    assert_eq!(status.recent[0].outcome, "panic");
    assert!(status.recent[0]
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("mock publisher panic"));
    assert_eq!(h.worker_dir_entries(0), 0);

    h.publisher.set_panic(false).await;
    h.enqueue(Task::new("src", fixtures::finite_item("second")));
    let status = h.wait_for_processed(2).await;

    assert_eq!(status.published, 1);
    assert_eq!(status.failed, 1);
    assert_eq!(h.maintenance.calls(), 2);

    h.pool.stop().await;
}

#[tokio::test]
async fn test_failing_maintenance_does_not_fail_task() {
    let h = TestHarness::with(1, 5, RecordingMaintenance::failing());

    h.pool.start().await.unwrap();
    h.enqueue(Task::new("src", fixtures::finite_item("a")));
    h.enqueue(Task::new("src", fixtures::finite_item("b")));
    let status = h.wait_for_processed(2).await;

    assert_eq!(status.published, 2);
    assert_eq!(h.maintenance.calls(), 2);

    h.pool.stop().await;
}

#[tokio::test]
async fn test_stale_files_cleared_on_start() {
    let h = TestHarness::new();
    let stale_dir = h.work_root.path().join("worker-0");
    std::fs::create_dir_all(&stale_dir).unwrap();
    std::fs::write(stale_dir.join("leftover.mp4.part"), b"x").unwrap();

    h.pool.start().await.unwrap();
    assert_eq!(h.worker_dir_entries(0), 0);

    h.pool.stop().await;
}

#[tokio::test]
async fn test_leftovers_between_tasks_removed_before_pipeline() {
    let h = TestHarness::new();

    h.pool.start().await.unwrap();
    std::fs::write(
        h.work_root.path().join("worker-0").join("orphan.mkv"),
        b"x",
    )
    .unwrap();
    h.enqueue(Task::new("src", fixtures::finite_item("fresh")));
    let status = h.wait_for_processed(1).await;

    assert_eq!(status.published, 1);
    let entries = h.transport.probe_dir_entries().await;
    assert!(!entries.is_empty());
    assert!(entries.iter().all(|&n| n == 0));
    assert_eq!(h.worker_dir_entries(0), 0);

    h.pool.stop().await;
}

#[tokio::test]
async fn test_idle_workers_exit_on_sentinel() {
    let h = TestHarness::with(3, 5, RecordingMaintenance::new());

    h.pool.start().await.unwrap();
    assert!(h.pool.status().await.running);

    let shutdown = h.pool.stop().await;
    assert_eq!(shutdown.joined, 3);
    assert_eq!(shutdown.aborted, 0);
    assert!(!h.pool.status().await.running);
}

#[tokio::test]
async fn test_stop_aborts_worker_past_grace_period() {
    let h = TestHarness::with(1, 1, RecordingMaintenance::new());
    h.transport
        .set_download_delay(Duration::from_secs(30))
        .await;

    h.pool.start().await.unwrap();
    h.enqueue(Task::new("src", fixtures::finite_item("slow")));
    h.wait_until_busy().await;

    let shutdown = h.pool.stop().await;
    assert_eq!(shutdown.joined, 0);
    assert_eq!(shutdown.aborted, 1);
    assert!(h.publisher.requests().await.is_empty());
}
