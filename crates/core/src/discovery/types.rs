use serde::{Deserialize, Serialize};

/// Canonical watch URL for an item id.
pub fn watch_url(item_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", item_id)
}

/// Newest entry of a source listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub title: String,
    pub item_id: String,
    pub canonical_url: String,
}

impl ListingEntry {
    pub fn new(title: impl Into<String>, item_id: impl Into<String>) -> Self {
        let item_id = item_id.into();
        Self {
            title: title.into(),
            canonical_url: watch_url(&item_id),
            item_id,
        }
    }
}

/// Live state reported by the upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LiveStatus {
    NotLive,
    IsLive,
    IsUpcoming,
    WasLive,
    PostLive,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Extended metadata used to classify a new item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemDetails {
    pub duration_seconds: Option<u64>,
    pub is_live: bool,
    pub live_status: LiveStatus,
}

impl ItemDetails {
    /// Live now, by either flag.
    pub fn is_live_now(&self) -> bool {
        self.is_live || self.live_status == LiveStatus::IsLive
    }

    pub fn is_upcoming(&self) -> bool {
        self.live_status == LiveStatus::IsUpcoming
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_status_deserialize() {
        let s: LiveStatus = serde_json::from_str("\"is_upcoming\"").unwrap();
        assert_eq!(s, LiveStatus::IsUpcoming);
        let s: LiveStatus = serde_json::from_str("\"something_new\"").unwrap();
        assert_eq!(s, LiveStatus::Unknown);
    }

    #[test]
    fn test_live_now_by_either_flag() {
        let by_flag = ItemDetails {
            is_live: true,
            ..Default::default()
        };
        let by_status = ItemDetails {
            live_status: LiveStatus::IsLive,
            ..Default::default()
        };
        assert!(by_flag.is_live_now());
        assert!(by_status.is_live_now());
        assert!(!ItemDetails::default().is_live_now());
    }

    #[test]
    fn test_listing_entry_url() {
        let entry = ListingEntry::new("t", "dQw4w9WgXcQ");
        assert_eq!(entry.canonical_url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }
}
