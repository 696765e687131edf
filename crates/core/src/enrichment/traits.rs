use async_trait::async_trait;

use super::types::Entities;

/// Title to background text.
///
/// Implementations never fail outward: a missing or broken collaborator
/// yields empty entities or an empty background.
#[async_trait]
pub trait Enricher: Send + Sync {
    fn name(&self) -> &str;

    /// Entity keywords found in the title.
    async fn entities(&self, title: &str) -> Entities;

    /// Free-text background for the entities, possibly empty.
    async fn background(&self, entities: &Entities) -> String;

    /// Both steps in sequence.
    async fn context(&self, title: &str) -> String {
        let entities = self.entities(title).await;
        if entities.is_empty() {
            return String::new();
        }
        self.background(&entities).await
    }
}
