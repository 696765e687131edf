//! Configuration for the media inspector.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the ffprobe/ffmpeg-based inspector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectorConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to ffprobe binary.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// Timeout for frame counting in seconds. Decoding a long file is slow.
    #[serde(default = "default_count_timeout")]
    pub count_frames_timeout_secs: u64,

    /// Timeout for summaries and image conversion in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_count_timeout() -> u64 {
    600
}

fn default_timeout() -> u64 {
    30
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            count_frames_timeout_secs: default_count_timeout(),
            timeout_secs: default_timeout(),
        }
    }
}

impl InspectorConfig {
    pub fn with_ffprobe_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffprobe_path = path.into();
        self
    }

    pub fn with_ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }
}
