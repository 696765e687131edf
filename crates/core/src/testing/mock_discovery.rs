//! Mock discovery tier for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::fixtures;
use crate::discovery::{watch_url, Discovery, DiscoveryError, ItemDetails, ListingEntry, LiveStatus};

/// Mock implementation of the Discovery trait.
///
/// Sources without a configured entry report [`DiscoveryError::Empty`].
/// Items without configured details are finite, 60 seconds long.
#[derive(Debug)]
pub struct MockDiscovery {
    name: String,
    latest: Arc<RwLock<HashMap<String, Option<ListingEntry>>>>,
    details: Arc<RwLock<HashMap<String, Option<ItemDetails>>>>,
    latest_calls: Arc<RwLock<usize>>,
    details_calls: Arc<RwLock<Vec<String>>>,
}

impl Default for MockDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDiscovery {
    pub fn new() -> Self {
        Self::named("mock")
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            latest: Arc::new(RwLock::new(HashMap::new())),
            details: Arc::new(RwLock::new(HashMap::new())),
            latest_calls: Arc::new(RwLock::new(0)),
            details_calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Make `source`'s newest item `(title, item_id)`.
    pub async fn set_latest(&self, source: &str, title: &str, item_id: &str) {
        self.latest
            .write()
            .await
            .insert(source.to_string(), Some(ListingEntry::new(title, item_id)));
    }

    /// Make listing `source` fail.
    pub async fn fail_latest(&self, source: &str) {
        self.latest.write().await.insert(source.to_string(), None);
    }

    pub async fn set_details(
        &self,
        item_id: &str,
        duration_seconds: Option<u64>,
        is_live: bool,
        live_status: LiveStatus,
    ) {
        self.details.write().await.insert(
            watch_url(item_id),
            Some(ItemDetails {
                duration_seconds,
                is_live,
                live_status,
            }),
        );
    }

    /// Make the metadata lookup for `item_id` fail.
    pub async fn fail_details(&self, item_id: &str) {
        self.details.write().await.insert(watch_url(item_id), None);
    }

    pub async fn latest_calls(&self) -> usize {
        *self.latest_calls.read().await
    }

    /// URLs passed to `details`, in call order.
    pub async fn details_calls(&self) -> Vec<String> {
        self.details_calls.read().await.clone()
    }
}

#[async_trait]
impl Discovery for MockDiscovery {
    fn name(&self) -> &str {
        &self.name
    }

    async fn latest(&self, source: &str) -> Result<ListingEntry, DiscoveryError> {
        *self.latest_calls.write().await += 1;
        match self.latest.read().await.get(source) {
            Some(Some(entry)) => Ok(entry.clone()),
            Some(None) => Err(DiscoveryError::Command {
                reason: format!("mock listing failure for {}", source),
            }),
            None => Err(DiscoveryError::Empty {
                source_id: source.to_string(),
            }),
        }
    }

    async fn details(&self, url: &str) -> Result<ItemDetails, DiscoveryError> {
        self.details_calls.write().await.push(url.to_string());
        match self.details.read().await.get(url) {
            Some(Some(details)) => Ok(details.clone()),
            Some(None) => Err(DiscoveryError::Command {
                reason: format!("mock details failure for {}", url),
            }),
            None => Ok(fixtures::finite_details(60)),
        }
    }
}
