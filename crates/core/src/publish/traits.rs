use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::error::PublishError;

/// Everything the upload needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub video_path: PathBuf,
    pub title: String,
    pub description: String,
    /// Comma-separated tags.
    pub tags: String,
    pub cover_path: Option<PathBuf>,
    /// Link to the original item, for attribution.
    pub source_link: String,
    pub category_id: u32,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    fn name(&self) -> &str;

    async fn publish(&self, request: &PublishRequest) -> Result<(), PublishError>;
}
