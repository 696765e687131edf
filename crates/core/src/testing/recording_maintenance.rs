//! Maintenance hook that counts invocations.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::workdir::MaintenanceHook;

#[derive(Debug, Default)]
pub struct RecordingMaintenance {
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl RecordingMaintenance {
    pub fn new() -> Self {
        Self::default()
    }

    /// A hook whose every invocation fails.
    pub fn failing() -> Self {
        let hook = Self::default();
        hook.fail.store(true, Ordering::SeqCst);
        hook
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MaintenanceHook for RecordingMaintenance {
    fn name(&self) -> &str {
        "recording"
    }

    async fn reclaim(&self) -> Result<(), String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            Err("mock maintenance failure".to_string())
        } else {
            Ok(())
        }
    }
}
