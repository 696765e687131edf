//! Mock translator for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::translate::{TranslateError, Translation, Translator};

/// Mock implementation of the Translator trait.
#[derive(Debug)]
pub struct MockTranslator {
    answer: Arc<RwLock<Option<Translation>>>,
    calls: Arc<RwLock<Vec<(String, String)>>>,
}

impl Default for MockTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTranslator {
    /// Answers `翻译标题` / `tag1,tag2` / category 51 until told otherwise.
    pub fn new() -> Self {
        Self {
            answer: Arc::new(RwLock::new(Some(Translation {
                title: "翻译标题".to_string(),
                tags: "tag1,tag2".to_string(),
                category_id: 51,
            }))),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn set_answer(&self, title: &str, tags: &str, category_id: u32) {
        *self.answer.write().await = Some(Translation {
            title: title.to_string(),
            tags: tags.to_string(),
            category_id,
        });
    }

    /// Make every translation fail as malformed.
    pub async fn set_malformed(&self) {
        *self.answer.write().await = None;
    }

    /// `(title, context)` pairs received, in call order.
    pub async fn calls(&self) -> Vec<(String, String)> {
        self.calls.read().await.clone()
    }
}

#[async_trait]
impl Translator for MockTranslator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn translate(&self, title: &str, context: &str) -> Result<Translation, TranslateError> {
        self.calls
            .write()
            .await
            .push((title.to_string(), context.to_string()));
        self.answer
            .read()
            .await
            .clone()
            .ok_or_else(|| TranslateError::Malformed {
                raw: "mock malformed answer".to_string(),
            })
    }
}
