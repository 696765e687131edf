//! Ordered discovery tiers.

use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, warn};

use super::error::DiscoveryError;
use super::traits::Discovery;
use super::types::{ItemDetails, ListingEntry};
use crate::acquisition::{first_success, LadderOutcome};
use crate::metrics;

type TierFuture<T> = Pin<Box<dyn Future<Output = Result<T, DiscoveryError>> + Send>>;

/// Tries each tier in order; the first success wins.
pub struct TieredDiscovery {
    tiers: Vec<Arc<dyn Discovery>>,
}

impl TieredDiscovery {
    pub fn new(tiers: Vec<Arc<dyn Discovery>>) -> Self {
        Self { tiers }
    }

    pub fn tier_names(&self) -> Vec<String> {
        self.tiers.iter().map(|t| t.name().to_string()).collect()
    }

    fn collapse<T>(
        operation: &str,
        outcome: LadderOutcome<Arc<dyn Discovery>, T, DiscoveryError>,
    ) -> Result<T, DiscoveryError> {
        for (tier, error) in outcome.failures() {
            if !matches!(error, DiscoveryError::Unsupported { .. }) {
                metrics::DISCOVERY_FAILURES
                    .with_label_values(&[tier.name()])
                    .inc();
                debug!(tier = tier.name(), operation, error = %error, "Discovery tier failed");
            }
        }
        match outcome {
            LadderOutcome::Success { key, value, index, .. } => {
                if index > 0 {
                    debug!(tier = key.name(), operation, "Discovery answered by fallback tier");
                }
                Ok(value)
            }
            LadderOutcome::Exhausted { failures } | LadderOutcome::Halted { failures, .. } => {
                metrics::DISCOVERY_FAILURES.with_label_values(&["all"]).inc();
                let errors: Vec<String> = failures
                    .into_iter()
                    .map(|(tier, e)| format!("{}: {}", tier.name(), e))
                    .collect();
                warn!(operation, "All discovery tiers failed");
                Err(DiscoveryError::AllTiersFailed { errors })
            }
        }
    }
}

#[async_trait]
impl Discovery for TieredDiscovery {
    fn name(&self) -> &str {
        "tiered"
    }

    async fn latest(&self, source: &str) -> Result<ListingEntry, DiscoveryError> {
        let source = source.to_string();
        let outcome = first_success(self.tiers.clone(), |tier: Arc<dyn Discovery>| {
            let source = source.clone();
            Box::pin(async move { tier.latest(&source).await }) as TierFuture<ListingEntry>
        })
        .await;
        Self::collapse("latest", outcome)
    }

    async fn details(&self, url: &str) -> Result<ItemDetails, DiscoveryError> {
        let url = url.to_string();
        let outcome = first_success(self.tiers.clone(), |tier: Arc<dyn Discovery>| {
            let url = url.clone();
            Box::pin(async move { tier.details(&url).await }) as TierFuture<ItemDetails>
        })
        .await;
        Self::collapse("details", outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDiscovery;

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let primary = Arc::new(MockDiscovery::named("listing"));
        primary.set_latest("src", "Title", "vid1").await;
        let feed = Arc::new(MockDiscovery::named("feed"));

        let tiered = TieredDiscovery::new(vec![primary.clone(), feed.clone()]);
        let entry = tiered.latest("src").await.unwrap();

        assert_eq!(entry.item_id, "vid1");
        assert_eq!(feed.latest_calls().await, 0);
    }

    #[tokio::test]
    async fn test_fallback_tier_used_on_primary_failure() {
        let primary = Arc::new(MockDiscovery::named("listing"));
        primary.fail_latest("src").await;
        let feed = Arc::new(MockDiscovery::named("feed"));
        feed.set_latest("src", "From feed", "vid2").await;

        let tiered = TieredDiscovery::new(vec![primary.clone(), feed.clone()]);
        let entry = tiered.latest("src").await.unwrap();

        assert_eq!(entry.item_id, "vid2");
        assert_eq!(primary.latest_calls().await, 1);
        assert_eq!(feed.latest_calls().await, 1);
    }

    #[tokio::test]
    async fn test_tiered_lookup_runs_on_spawned_task() {
        let primary = Arc::new(MockDiscovery::named("listing"));
        primary.fail_latest("src").await;
        let feed = Arc::new(MockDiscovery::named("feed"));
        feed.set_latest("src", "From feed", "vid3").await;

        let tiered: Arc<dyn Discovery> = Arc::new(TieredDiscovery::new(vec![primary, feed]));
        let handle = {
            let tiered = Arc::clone(&tiered);
            tokio::spawn(async move { tiered.latest("src").await })
        };
        let entry = handle.await.unwrap().unwrap();
        assert_eq!(entry.item_id, "vid3");

        let details = tokio::spawn(async move { tiered.details(&entry.canonical_url).await })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(details.duration_seconds, Some(60));
    }

    #[tokio::test]
    async fn test_all_tiers_failing() {
        let primary = Arc::new(MockDiscovery::named("listing"));
        primary.fail_latest("src").await;
        let feed = Arc::new(MockDiscovery::named("feed"));
        feed.fail_latest("src").await;

        let tiered = TieredDiscovery::new(vec![primary, feed]);
        let err = tiered.latest("src").await.unwrap_err();
        match err {
            DiscoveryError::AllTiersFailed { errors } => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }
}
