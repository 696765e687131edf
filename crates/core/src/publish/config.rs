use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::translate::DEFAULT_TAG;

/// Upload tool configuration (the `[publish]` section).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BiliupConfig {
    #[serde(default = "default_binary")]
    pub binary: PathBuf,
    /// Descriptions are cut to this many characters.
    #[serde(default = "default_description_limit")]
    pub description_limit: usize,
    #[serde(default = "default_tag")]
    pub default_tag: String,
    /// Concurrent upload lines passed as `--limit`.
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// 1 = original, 2 = repost.
    #[serde(default = "default_copyright")]
    pub copyright: u8,
    #[serde(default = "default_submit")]
    pub submit: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_binary() -> PathBuf {
    PathBuf::from("biliup_rs")
}

fn default_description_limit() -> usize {
    1800
}

fn default_tag() -> String {
    DEFAULT_TAG.to_string()
}

fn default_limit() -> u32 {
    1
}

fn default_copyright() -> u8 {
    2
}

fn default_submit() -> String {
    "app".to_string()
}

fn default_timeout_secs() -> u64 {
    3600
}

impl Default for BiliupConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            description_limit: default_description_limit(),
            default_tag: default_tag(),
            limit: default_limit(),
            copyright: default_copyright(),
            submit: default_submit(),
            timeout_secs: default_timeout_secs(),
            extra_args: Vec::new(),
        }
    }
}

impl BiliupConfig {
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}
