use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::TranslateError;

/// Translated title, tags and upload category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub title: String,
    /// Comma-separated tag list.
    pub tags: String,
    pub category_id: u32,
}

#[async_trait]
pub trait Translator: Send + Sync {
    fn name(&self) -> &str;

    /// Translate `title`, using `context` (possibly empty) as background.
    async fn translate(&self, title: &str, context: &str) -> Result<Translation, TranslateError>;
}
