//! Bounded capture of live items.
//!
//! A live item is captured with two independent limits: a declarative
//! "first N seconds" window handed to the transport, and an elapsed-time
//! observer that aborts the transfer once the cap is reached. Hitting the
//! cap is a failure, never a truncated success.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::error::AcquisitionError;
use super::protocol::{AcquisitionProtocol, LiveWindow};
use super::transport::ProgressObserver;
use super::types::{AcquiredMedia, ProgressControl, TransferProgress};
use crate::metrics;
use crate::queue::DiscoveredItem;

/// Aborts once elapsed time reaches the cap.
#[derive(Debug)]
pub struct ElapsedCapObserver {
    cap: Duration,
    tripped: AtomicBool,
}

impl ElapsedCapObserver {
    pub fn new(cap: Duration) -> Self {
        Self {
            cap,
            tripped: AtomicBool::new(false),
        }
    }

    pub fn cap(&self) -> Duration {
        self.cap
    }

    /// True once the observer has requested an abort.
    pub fn tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }
}

impl ProgressObserver for ElapsedCapObserver {
    fn on_progress(&self, progress: &TransferProgress) -> ProgressControl {
        if progress.elapsed >= self.cap {
            if !self.tripped.swap(true, Ordering::SeqCst) {
                info!(
                    elapsed_secs = progress.elapsed.as_secs(),
                    cap_secs = self.cap.as_secs(),
                    "Live capture reached its cap, aborting"
                );
            }
            ProgressControl::Abort
        } else {
            ProgressControl::Continue
        }
    }
}

/// Routes items through the acquisition protocol, adding the live limits
/// for live items.
pub struct LiveCaptureBridge {
    protocol: Arc<AcquisitionProtocol>,
}

impl LiveCaptureBridge {
    pub fn new(protocol: Arc<AcquisitionProtocol>) -> Self {
        Self { protocol }
    }

    pub fn protocol(&self) -> &AcquisitionProtocol {
        &self.protocol
    }

    /// Acquire `item` into `work_dir`.
    pub async fn acquire(
        &self,
        item: &DiscoveredItem,
        work_dir: &Path,
    ) -> Result<AcquiredMedia, AcquisitionError> {
        let cap = match item.live_cap() {
            Some(cap) if item.is_live() => cap,
            _ => return self.protocol.acquire(item, work_dir, None).await,
        };

        let observer = Arc::new(ElapsedCapObserver::new(cap));
        let window = LiveWindow {
            cap,
            observer: observer.clone(),
        };

        info!(item_id = item.item_id(), cap_secs = cap.as_secs(), "Starting live capture");
        let result = self.protocol.acquire(item, work_dir, Some(window)).await;

        if let Err(ref e) = result {
            if observer.tripped() || e.is_live_abort() {
                metrics::LIVE_ABORTS.inc();
            }
            match purge_partials(work_dir, item.item_id()).await {
                Ok(0) => {}
                Ok(n) => debug!(item_id = item.item_id(), removed = n, "Purged partial live artifacts"),
                Err(err) => warn!(item_id = item.item_id(), error = %err, "Failed to purge partial live artifacts"),
            }
        }
        result
    }
}

/// Delete every file in `dir` whose name starts with `item_id`.
pub async fn purge_partials(dir: &Path, item_id: &str) -> std::io::Result<usize> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };
    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(item_id) {
            continue;
        }
        let path = entry.path();
        if entry.file_type().await?.is_dir() {
            tokio::fs::remove_dir_all(&path).await?;
        } else {
            tokio::fs::remove_file(&path).await?;
        }
        removed += 1;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(secs: u64) -> TransferProgress {
        TransferProgress {
            elapsed: Duration::from_secs(secs),
            downloaded_bytes: None,
        }
    }

    #[test]
    fn test_observer_fires_at_cap() {
        let observer = ElapsedCapObserver::new(Duration::from_secs(1800));
        assert_eq!(observer.on_progress(&progress(0)), ProgressControl::Continue);
        assert_eq!(observer.on_progress(&progress(1799)), ProgressControl::Continue);
        assert!(!observer.tripped());
        assert_eq!(observer.on_progress(&progress(1800)), ProgressControl::Abort);
        assert!(observer.tripped());
        assert_eq!(observer.on_progress(&progress(2400)), ProgressControl::Abort);
    }

    #[tokio::test]
    async fn test_purge_partials_only_touches_item_files() {
        let temp = tempfile::TempDir::new().unwrap();
        for name in ["abc.mp4.part", "abc.f137.mp4", "abc.webp", "other.mp4"] {
            tokio::fs::write(temp.path().join(name), b"x").await.unwrap();
        }
        let removed = purge_partials(temp.path(), "abc").await.unwrap();
        assert_eq!(removed, 3);
        assert!(temp.path().join("other.mp4").exists());
    }

    #[tokio::test]
    async fn test_purge_partials_missing_dir() {
        assert_eq!(
            purge_partials(Path::new("/nonexistent/dir"), "abc").await.unwrap(),
            0
        );
    }
}
