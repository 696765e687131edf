use async_trait::async_trait;
use std::path::Path;

use super::error::MediaError;
use super::types::VideoSummary;

/// Inspects and converts media files on local disk.
#[async_trait]
pub trait MediaInspector: Send + Sync {
    fn name(&self) -> &str;

    /// Count decoded frames of the first video stream.
    async fn count_frames(&self, path: &Path) -> Result<u64, MediaError>;

    /// Describe the first video stream.
    async fn video_summary(&self, path: &Path) -> Result<VideoSummary, MediaError>;

    /// Convert an image (webp, jpg) into the format implied by `output`'s extension.
    async fn convert_image(&self, input: &Path, output: &Path) -> Result<(), MediaError>;
}
