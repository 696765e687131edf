//! Configuration for the source monitor.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between poll cycles.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Finite items longer than this are skipped.
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: u64,

    /// Capture cap applied to live items.
    #[serde(default = "default_live_cap")]
    pub live_cap_secs: u64,

    /// Timeout for one discovery call (listing or details).
    #[serde(default = "default_discovery_timeout")]
    pub discovery_timeout_secs: u64,

    /// Enable the Atom feed fallback tier.
    #[serde(default = "default_true")]
    pub feed_fallback: bool,

    /// HTTP timeout for the feed tier.
    #[serde(default = "default_feed_timeout")]
    pub feed_timeout_secs: u64,
}

fn default_poll_interval() -> u64 {
    100
}

fn default_max_duration() -> u64 {
    3600
}

fn default_live_cap() -> u64 {
    1800
}

fn default_discovery_timeout() -> u64 {
    180
}

fn default_true() -> bool {
    true
}

fn default_feed_timeout() -> u64 {
    10
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            max_duration_secs: default_max_duration(),
            live_cap_secs: default_live_cap(),
            discovery_timeout_secs: default_discovery_timeout(),
            feed_fallback: default_true(),
            feed_timeout_secs: default_feed_timeout(),
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_secs)
    }

    pub fn with_poll_interval_secs(mut self, secs: u64) -> Self {
        self.poll_interval_secs = secs;
        self
    }

    pub fn with_max_duration_secs(mut self, secs: u64) -> Self {
        self.max_duration_secs = secs;
        self
    }

    pub fn with_live_cap_secs(mut self, secs: u64) -> Self {
        self.live_cap_secs = secs;
        self
    }

    pub fn with_discovery_timeout_secs(mut self, secs: u64) -> Self {
        self.discovery_timeout_secs = secs;
        self
    }
}
