use async_trait::async_trait;

use super::error::DiscoveryError;
use super::types::{ItemDetails, ListingEntry};

/// Source of listings and item metadata.
#[async_trait]
pub trait Discovery: Send + Sync {
    fn name(&self) -> &str;

    /// Newest item of `source`.
    async fn latest(&self, source: &str) -> Result<ListingEntry, DiscoveryError>;

    /// Duration and live state of the item at `url`.
    async fn details(&self, url: &str) -> Result<ItemDetails, DiscoveryError>;
}
