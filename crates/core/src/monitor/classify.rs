//! Classification of newly seen items.

use crate::discovery::{ItemDetails, ListingEntry};
use crate::queue::{DiscoveredItem, QueueError};

use super::config::MonitorConfig;

/// Decision for a new item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Enqueue(DiscoveredItem),
    /// Scheduled but not started.
    SkipUpcoming,
    /// Finite item above the duration limit.
    SkipTooLong { duration_secs: u64, max_secs: u64 },
}

impl Classification {
    pub fn skip_reason(&self) -> Option<&'static str> {
        match self {
            Self::Enqueue(_) => None,
            Self::SkipUpcoming => Some("upcoming"),
            Self::SkipTooLong { .. } => Some("too_long"),
        }
    }
}

/// Classify a new item from its listing entry and extended metadata.
///
/// Live items are exempt from the duration limit; their capture is capped
/// at `live_cap_secs` instead.
pub fn classify(
    entry: &ListingEntry,
    details: &ItemDetails,
    config: &MonitorConfig,
) -> Result<Classification, QueueError> {
    if details.is_upcoming() {
        return Ok(Classification::SkipUpcoming);
    }

    if details.is_live_now() {
        return DiscoveredItem::live(
            entry.title.clone(),
            entry.item_id.clone(),
            entry.canonical_url.clone(),
            config.live_cap_secs,
        )
        .map(Classification::Enqueue);
    }

    let duration_secs = details.duration_seconds.unwrap_or(0);
    if duration_secs > config.max_duration_secs {
        return Ok(Classification::SkipTooLong {
            duration_secs,
            max_secs: config.max_duration_secs,
        });
    }

    DiscoveredItem::finite(
        entry.title.clone(),
        entry.item_id.clone(),
        entry.canonical_url.clone(),
    )
    .map(Classification::Enqueue)
}
