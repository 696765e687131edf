//! Optional resource hygiene run after every task.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info};

const DROP_CACHES_PATH: &str = "/proc/sys/vm/drop_caches";

/// Hook invoked on every task exit path.
///
/// Implementations must be best-effort: errors are reported as strings,
/// logged by the caller and never escalated.
#[async_trait]
pub trait MaintenanceHook: Send + Sync {
    fn name(&self) -> &str;

    async fn reclaim(&self) -> Result<(), String>;
}

/// Does nothing. Default when cache reclamation is disabled.
#[derive(Debug, Default, Clone)]
pub struct NoopMaintenance;

#[async_trait]
impl MaintenanceHook for NoopMaintenance {
    fn name(&self) -> &str {
        "noop"
    }

    async fn reclaim(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Maintenance configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    /// Ask the kernel to drop page caches after every task.
    #[serde(default)]
    pub drop_caches: bool,
    /// Timeout for each maintenance subprocess.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    3
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            drop_caches: false,
            timeout_secs: default_timeout(),
        }
    }
}

/// Flushes dirty pages and drops the page cache.
///
/// Writes `/proc/sys/vm/drop_caches` directly when permitted, otherwise
/// tries a password-less `sudo -n`.
#[derive(Debug, Clone)]
pub struct DropCachesHook {
    timeout: Duration,
}

impl DropCachesHook {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn run(&self, program: &str, args: &[&str]) -> Result<(), String> {
        let status = tokio::time::timeout(
            self.timeout,
            Command::new(program)
                .args(args)
                .stdin(std::process::Stdio::null())
                .stdout(std::process::Stdio::null())
                .stderr(std::process::Stdio::null())
                .kill_on_drop(true)
                .status(),
        )
        .await
        .map_err(|_| format!("{} timed out after {:?}", program, self.timeout))?
        .map_err(|e| format!("{} failed to start: {}", program, e))?;

        if status.success() {
            Ok(())
        } else {
            Err(format!("{} exited with code {:?}", program, status.code()))
        }
    }
}

#[async_trait]
impl MaintenanceHook for DropCachesHook {
    fn name(&self) -> &str {
        "drop_caches"
    }

    async fn reclaim(&self) -> Result<(), String> {
        if let Err(e) = self.run("sync", &[]).await {
            debug!("sync skipped: {}", e);
        }

        match tokio::fs::write(DROP_CACHES_PATH, b"3\n").await {
            Ok(()) => {
                info!("drop_caches=3 written directly");
                return Ok(());
            }
            Err(e) => debug!("Direct drop_caches write failed: {}", e),
        }

        self.run(
            "sudo",
            &["-n", "sh", "-c", "sync; echo 3 > /proc/sys/vm/drop_caches"],
        )
        .await?;
        info!("drop_caches=3 written via sudo -n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_always_succeeds() {
        let hook = NoopMaintenance;
        assert_eq!(hook.name(), "noop");
        assert!(hook.reclaim().await.is_ok());
    }

    #[test]
    fn test_default_config() {
        let config = MaintenanceConfig::default();
        assert!(!config.drop_caches);
        assert_eq!(config.timeout_secs, 3);
    }

    #[tokio::test]
    async fn test_missing_program_is_reported_not_raised() {
        let hook = DropCachesHook::new(Duration::from_millis(500));
        let result = hook.run("definitely-not-a-real-binary-xyz", &[]).await;
        assert!(result.is_err());
    }
}
