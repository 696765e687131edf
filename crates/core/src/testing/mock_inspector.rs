//! Mock media inspector for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::media::{MediaError, MediaInspector, VideoSummary};

/// Mock implementation of the MediaInspector trait.
///
/// Reports 1000 frames unless told otherwise. `convert_image` copies the
/// input to the output path.
#[derive(Debug)]
pub struct MockInspector {
    frame_count: Arc<RwLock<Option<u64>>>,
    conversions: Arc<RwLock<Vec<(PathBuf, PathBuf)>>>,
}

impl Default for MockInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockInspector {
    pub fn new() -> Self {
        Self {
            frame_count: Arc::new(RwLock::new(Some(1000))),
            conversions: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn set_frame_count(&self, frames: u64) {
        *self.frame_count.write().await = Some(frames);
    }

    /// Make frame counting fail, as when ffprobe is unavailable.
    pub async fn set_frame_count_error(&self) {
        *self.frame_count.write().await = None;
    }

    pub async fn conversions(&self) -> Vec<(PathBuf, PathBuf)> {
        self.conversions.read().await.clone()
    }
}

#[async_trait]
impl MediaInspector for MockInspector {
    fn name(&self) -> &str {
        "mock"
    }

    async fn count_frames(&self, path: &Path) -> Result<u64, MediaError> {
        if !path.exists() {
            return Err(MediaError::InputNotFound {
                path: path.to_path_buf(),
            });
        }
        self.frame_count
            .read()
            .await
            .ok_or_else(|| MediaError::tool_failed("ffprobe", "mock failure"))
    }

    async fn video_summary(&self, _path: &Path) -> Result<VideoSummary, MediaError> {
        Ok(VideoSummary {
            width: Some(1920),
            height: Some(1080),
            codec: Some("h264".to_string()),
            fps: Some(30.0),
        })
    }

    async fn convert_image(&self, input: &Path, output: &Path) -> Result<(), MediaError> {
        tokio::fs::copy(input, output).await?;
        self.conversions
            .write()
            .await
            .push((input.to_path_buf(), output.to_path_buf()));
        Ok(())
    }
}
