use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bangumi lookup configuration (the `[bangumi]` section).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BangumiConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Optional personal access token, sent as a bearer token.
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Tags listed in the background block.
    #[serde(default = "default_max_tags")]
    pub max_tags: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_base_url() -> String {
    "https://api.bgm.tv".to_string()
}

fn default_user_agent() -> String {
    "YtbBiliScript/1.0.0".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_tags() -> usize {
    10
}

impl Default for BangumiConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            base_url: default_base_url(),
            token: None,
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            max_tags: default_max_tags(),
        }
    }
}

impl BangumiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}
