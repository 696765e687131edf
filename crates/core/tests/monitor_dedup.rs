//! Source monitor integration tests.
//!
//! Drives the monitor across several poll cycles and sources and checks
//! what reaches the queue, then runs the full producer/consumer path.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use mirror_core::{
    acquisition::{AcquisitionConfig, AcquisitionProtocol, LiveCaptureBridge},
    discovery::LiveStatus,
    monitor::SourceOutcome,
    queue::{Dequeued, QueueMessage, TaskReceiver},
    testing::{
        fixtures, MockDiscovery, MockEnricher, MockInspector, MockPublisher, MockTranslator, MockTransport,
        RecordingMaintenance,
    },
    MonitorConfig, SourceMonitor, SourceRegistry, Task, TaskPipeline, TaskQueue, WorkerPool,
    WorkerPoolConfig,
};

fn monitor(discovery: &Arc<MockDiscovery>, queue: &TaskQueue, sources: &[&str]) -> SourceMonitor {
    SourceMonitor::new(
        MonitorConfig::default()
            .with_max_duration_secs(3600)
            .with_live_cap_secs(1800),
        SourceRegistry::new(sources.iter().copied()),
        discovery.clone(),
        queue.sender(),
    )
}

async fn drain(receiver: &TaskReceiver) -> Vec<Task> {
    let mut tasks = Vec::new();
    while let Dequeued::Message(QueueMessage::Task(task)) =
        receiver.dequeue(Duration::from_millis(20)).await
    {
        tasks.push(task);
    }
    tasks
}

#[tokio::test]
async fn test_each_new_item_enqueued_exactly_once() {
    let discovery = Arc::new(MockDiscovery::new());
    discovery.set_latest("alpha", "A0", "a0").await;
    discovery.set_latest("beta", "B0", "b0").await;
    let queue = TaskQueue::new(16);
    let m = monitor(&discovery, &queue, &["alpha", "beta"]);
    let receiver = queue.receiver();

    let report = m.poll_once().await;
    assert_eq!(report.first_seen, 2);
    assert!(drain(&receiver).await.is_empty());

    discovery.set_latest("alpha", "A1", "a1").await;
    for _ in 0..3 {
        m.poll_once().await;
    }
    discovery.set_latest("beta", "B1", "b1").await;
    discovery.set_latest("alpha", "A2", "a2").await;
    m.poll_once().await;
    m.poll_once().await;

    let ids: Vec<(String, String)> = drain(&receiver)
        .await
        .into_iter()
        .map(|t| (t.source, t.item.item_id().to_string()))
        .collect();
    assert_eq!(
        ids,
        vec![
            ("alpha".to_string(), "a1".to_string()),
            ("alpha".to_string(), "a2".to_string()),
            ("beta".to_string(), "b1".to_string()),
        ]
    );

    let status = m.status().await;
    assert_eq!(status.cycles, 6);
    assert_eq!(status.enqueued, 3);
    assert_eq!(status.tracked_sources, 2);
}

#[tokio::test]
async fn test_classification_across_sources() {
    let discovery = Arc::new(MockDiscovery::new());
    for source in ["long", "live", "soon", "ok"] {
        discovery.set_latest(source, "old", &format!("{}-0", source)).await;
    }
    let queue = TaskQueue::new(16);
    let m = monitor(&discovery, &queue, &["long", "live", "soon", "ok"]);
    m.poll_once().await;

    discovery.set_latest("long", "Long", "long-1").await;
    discovery
        .set_details("long-1", Some(7200), false, LiveStatus::NotLive)
        .await;
    discovery.set_latest("live", "Live", "live-1").await;
    discovery
        .set_details("live-1", None, true, LiveStatus::IsLive)
        .await;
    discovery.set_latest("soon", "Soon", "soon-1").await;
    discovery
        .set_details("soon-1", None, false, LiveStatus::IsUpcoming)
        .await;
    discovery.set_latest("ok", "Ok", "ok-1").await;
    discovery
        .set_details("ok-1", Some(3600), false, LiveStatus::NotLive)
        .await;

    assert_eq!(m.poll_source("long").await, SourceOutcome::Skipped("too_long"));
    assert_eq!(m.poll_source("live").await, SourceOutcome::Enqueued);
    assert_eq!(m.poll_source("soon").await, SourceOutcome::Skipped("upcoming"));
    assert_eq!(m.poll_source("ok").await, SourceOutcome::Enqueued);

    let tasks = drain(&queue.receiver()).await;
    assert_eq!(tasks.len(), 2);
    assert!(tasks[0].item.is_live());
    assert_eq!(tasks[0].item.live_cap_secs(), Some(1800));
    assert!(!tasks[1].item.is_live());

    // a skipped item is not reconsidered on the next cycle
    assert_eq!(m.poll_source("long").await, SourceOutcome::Unchanged);
}

#[tokio::test]
async fn test_failing_source_does_not_block_others() {
    let discovery = Arc::new(MockDiscovery::new());
    discovery.set_latest("good", "G0", "g0").await;
    discovery.fail_latest("bad").await;
    let queue = TaskQueue::new(16);
    let m = monitor(&discovery, &queue, &["bad", "good"]);

    let report = m.poll_once().await;
    assert_eq!(report.discovery_failures, 1);
    assert_eq!(report.first_seen, 1);
    assert_eq!(m.last_seen("bad").await, None);

    discovery.set_latest("good", "G1", "g1").await;
    let report = m.poll_once().await;
    assert_eq!(report.enqueued, 1);
    assert_eq!(m.status().await.discovery_failures, 2);
}

#[tokio::test]
async fn test_new_item_flows_from_monitor_to_publish() {
    let work_root = TempDir::new().unwrap();
    let discovery = Arc::new(MockDiscovery::new());
    discovery.set_latest("chan", "First", "v0").await;
    discovery
        .set_details("v1", Some(500), false, LiveStatus::NotLive)
        .await;

    let queue = TaskQueue::new(8);
    let m = Arc::new(
        SourceMonitor::new(
            MonitorConfig::default().with_poll_interval_secs(1),
            SourceRegistry::new(vec!["chan"]),
            discovery.clone(),
            queue.sender(),
        ),
    );

    let transport = Arc::new(MockTransport::new());
    transport
        .set_probe("web", fixtures::probe_with_height("v1", 360))
        .await;
    transport
        .set_probe("android", fixtures::probe_with_height("v1", 1080))
        .await;
    let translator = Arc::new(MockTranslator::new());
    translator.set_answer("标题", "tag1,tag2", 51).await;

    let protocol = Arc::new(AcquisitionProtocol::new(
        transport.clone(),
        Arc::new(MockInspector::new()),
        AcquisitionConfig::default(),
    ));
    let publisher = Arc::new(MockPublisher::new());
    let pipeline = Arc::new(TaskPipeline::new(
        Arc::new(LiveCaptureBridge::new(protocol)),
        Arc::new(MockEnricher::new()),
        translator.clone(),
        publisher.clone(),
    ));
    let pool = WorkerPool::new(
        WorkerPoolConfig::default()
            .with_count(2)
            .with_work_root(work_root.path())
            .with_dequeue_timeout_ms(50),
        &queue,
        pipeline,
        Arc::new(RecordingMaintenance::new()),
    );
    pool.start().await.unwrap();

    let runner = {
        let m = Arc::clone(&m);
        tokio::spawn(async move { m.run().await })
    };

    // let the baseline cycle happen, then publish something new
    tokio::time::sleep(Duration::from_millis(200)).await;
    discovery.set_latest("chan", "Second", "v1").await;

    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let status = pool.status().await;
        if status.published == 1 && status.busy == 0 {
            break;
        }
        assert!(Instant::now() < deadline, "item never published: {:?}", status);
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    m.stop();
    tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("monitor did not stop")
        .unwrap();
    pool.stop().await;

    assert_eq!(m.last_seen("chan").await.as_deref(), Some("v1"));
    assert_eq!(transport.probe_calls().await, vec!["web", "android"]);
    assert_eq!(transport.download_calls().await, vec!["android"]);
    assert!(transport.download_options().await[0].disable_proxy);
    assert_eq!(translator.calls().await[0].0, "Second");

    let requests = publisher.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].title, "标题");
    assert_eq!(requests[0].tags, "tag1,tag2");
    assert_eq!(requests[0].source_link, "https://www.youtube.com/watch?v=v1");
    assert!(std::fs::read_dir(work_root.path().join("worker-0")).unwrap().next().is_none());
    assert!(std::fs::read_dir(work_root.path().join("worker-1")).unwrap().next().is_none());
}
