//! Mock enricher for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::enrichment::{Enricher, Entities};

/// Mock implementation of the Enricher trait.
///
/// Every title yields itself as the work name; the background is whatever
/// was configured (empty by default).
#[derive(Debug, Default)]
pub struct MockEnricher {
    context: Arc<RwLock<String>>,
    titles: Arc<RwLock<Vec<String>>>,
}

impl MockEnricher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_context(&self, context: &str) {
        *self.context.write().await = context.to_string();
    }

    /// Titles seen, in call order.
    pub async fn titles(&self) -> Vec<String> {
        self.titles.read().await.clone()
    }
}

#[async_trait]
impl Enricher for MockEnricher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn entities(&self, title: &str) -> Entities {
        self.titles.write().await.push(title.to_string());
        Entities::work(title)
    }

    async fn background(&self, _entities: &Entities) -> String {
        self.context.read().await.clone()
    }
}
