//! Bounded task queue between the source monitor and the worker pool.
//!
//! Producers never block: a full queue rejects the task and hands it back
//! to the caller. Consumers share one receiver and dequeue with a timeout
//! so they can observe the stop flag between attempts.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

/// Errors raised while constructing or transporting tasks.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue is at capacity; the task was not enqueued.
    #[error("task queue full (capacity {capacity}), dropped item {item_id}")]
    Full { capacity: usize, item_id: String },

    /// All receivers are gone.
    #[error("task queue closed")]
    Closed,

    /// A discovered item failed validation.
    #[error("invalid item: {0}")]
    InvalidItem(String),
}

/// One newly published item found by the source monitor.
///
/// Immutable once constructed; the constructors enforce that a live item
/// always carries a capture cap and a finite item never does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawItem")]
pub struct DiscoveredItem {
    title: String,
    item_id: String,
    canonical_url: String,
    is_live: bool,
    live_cap_secs: Option<u64>,
}

impl DiscoveredItem {
    /// A finite (on-demand) item.
    pub fn finite(
        title: impl Into<String>,
        item_id: impl Into<String>,
        canonical_url: impl Into<String>,
    ) -> Result<Self, QueueError> {
        Self::build(title.into(), item_id.into(), canonical_url.into(), None)
    }

    /// A live item captured for at most `cap_secs` seconds.
    pub fn live(
        title: impl Into<String>,
        item_id: impl Into<String>,
        canonical_url: impl Into<String>,
        cap_secs: u64,
    ) -> Result<Self, QueueError> {
        if cap_secs == 0 {
            return Err(QueueError::InvalidItem(
                "live capture cap must be positive".to_string(),
            ));
        }
        Self::build(
            title.into(),
            item_id.into(),
            canonical_url.into(),
            Some(cap_secs),
        )
    }

    fn build(
        title: String,
        item_id: String,
        canonical_url: String,
        live_cap_secs: Option<u64>,
    ) -> Result<Self, QueueError> {
        let item_id = item_id.trim().to_string();
        if item_id.is_empty() {
            return Err(QueueError::InvalidItem("empty item id".to_string()));
        }
        if canonical_url.trim().is_empty() {
            return Err(QueueError::InvalidItem(format!(
                "empty url for item {}",
                item_id
            )));
        }
        Ok(Self {
            title,
            item_id,
            canonical_url,
            is_live: live_cap_secs.is_some(),
            live_cap_secs,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn canonical_url(&self) -> &str {
        &self.canonical_url
    }

    pub fn is_live(&self) -> bool {
        self.is_live
    }

    pub fn live_cap(&self) -> Option<Duration> {
        self.live_cap_secs.map(Duration::from_secs)
    }

    pub fn live_cap_secs(&self) -> Option<u64> {
        self.live_cap_secs
    }
}

/// Wire form of [`DiscoveredItem`]; deserialization goes through the
/// validating constructors.
#[derive(Deserialize)]
struct RawItem {
    title: String,
    item_id: String,
    canonical_url: String,
    #[serde(default)]
    is_live: bool,
    #[serde(default)]
    live_cap_secs: Option<u64>,
}

impl TryFrom<RawItem> for DiscoveredItem {
    type Error = QueueError;

    fn try_from(raw: RawItem) -> Result<Self, Self::Error> {
        match (raw.is_live, raw.live_cap_secs) {
            (true, Some(cap)) => Self::live(raw.title, raw.item_id, raw.canonical_url, cap),
            (false, None) => Self::finite(raw.title, raw.item_id, raw.canonical_url),
            (true, None) => Err(QueueError::InvalidItem(format!(
                "live item {} has no capture cap",
                raw.item_id
            ))),
            (false, Some(_)) => Err(QueueError::InvalidItem(format!(
                "finite item {} carries a capture cap",
                raw.item_id
            ))),
        }
    }
}

/// Queue transport wrapper for a discovered item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique id for log correlation.
    pub id: String,
    /// Source the item was discovered on.
    pub source: String,
    /// The item itself.
    pub item: DiscoveredItem,
    /// When the monitor discovered the item.
    pub discovered_at: DateTime<Utc>,
}

impl Task {
    pub fn new(source: impl Into<String>, item: DiscoveredItem) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source: source.into(),
            item,
            discovered_at: Utc::now(),
        }
    }
}

/// A message carried by the queue.
#[derive(Debug, Clone)]
pub enum QueueMessage {
    Task(Task),
    /// Tells exactly one worker to exit.
    Shutdown,
}

/// Result of a single dequeue attempt.
#[derive(Debug)]
pub enum Dequeued {
    Message(QueueMessage),
    TimedOut,
    Closed,
}

/// Bounded multi-producer, multi-consumer task queue.
pub struct TaskQueue {
    tx: mpsc::Sender<QueueMessage>,
    rx: Arc<Mutex<mpsc::Receiver<QueueMessage>>>,
}

impl TaskQueue {
    /// Create a queue holding at most `capacity` messages.
    ///
    /// # Panics
    /// Panics if `capacity` is 0; configuration validation rejects that.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    pub fn sender(&self) -> TaskSender {
        TaskSender {
            tx: self.tx.clone(),
        }
    }

    pub fn receiver(&self) -> TaskReceiver {
        TaskReceiver {
            rx: Arc::clone(&self.rx),
        }
    }
}

/// Producer half. Cheap to clone.
#[derive(Clone)]
pub struct TaskSender {
    tx: mpsc::Sender<QueueMessage>,
}

impl TaskSender {
    /// Enqueue without waiting. A full queue rejects the task.
    pub fn try_enqueue(&self, task: Task) -> Result<(), QueueError> {
        match self.tx.try_send(QueueMessage::Task(task)) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(msg)) => Err(QueueError::Full {
                capacity: self.tx.max_capacity(),
                item_id: match msg {
                    QueueMessage::Task(t) => t.item.item_id().to_string(),
                    QueueMessage::Shutdown => String::new(),
                },
            }),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(QueueError::Closed),
        }
    }

    /// Send one shutdown sentinel, waiting at most `wait` for a free slot.
    pub async fn send_shutdown(&self, wait: Duration) -> Result<(), QueueError> {
        self.tx
            .send_timeout(QueueMessage::Shutdown, wait)
            .await
            .map_err(|_| QueueError::Closed)
    }

    /// Number of messages currently waiting.
    pub fn depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

/// Consumer half, shared by every worker.
#[derive(Clone)]
pub struct TaskReceiver {
    rx: Arc<Mutex<mpsc::Receiver<QueueMessage>>>,
}

impl TaskReceiver {
    /// Wait up to `wait` for the next message.
    pub async fn dequeue(&self, wait: Duration) -> Dequeued {
        let attempt = async {
            let mut rx = self.rx.lock().await;
            rx.recv().await
        };
        match tokio::time::timeout(wait, attempt).await {
            Ok(Some(msg)) => Dequeued::Message(msg),
            Ok(None) => Dequeued::Closed,
            Err(_) => Dequeued::TimedOut,
        }
    }
}
