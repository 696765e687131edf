//! Atom feed fallback tier.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::debug;

use super::error::DiscoveryError;
use super::traits::Discovery;
use super::types::{ItemDetails, ListingEntry};
use crate::metrics;

const DEFAULT_FEED_BASE: &str = "https://www.youtube.com";
const FEED_USER_AGENT: &str = "Mozilla/5.0";

static PLAYLIST_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:[?&]list=|^)([0-9A-Za-z_-]{24})").unwrap());
static UPLOADS_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[Uu][Uu][0-9A-Za-z_-]{22}$").unwrap());

/// Extract a 24-character playlist id from a playlist URL or a bare id.
pub fn playlist_id(source: &str) -> Option<String> {
    PLAYLIST_ID
        .captures(source.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Derive the channel id (`UC…`) from an uploads playlist source (`UU…`).
pub fn channel_id_for_source(source: &str) -> Option<String> {
    let id = playlist_id(source)?;
    if UPLOADS_ID.is_match(&id) {
        Some(format!("UC{}", &id[2..]))
    } else {
        None
    }
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    #[serde(rename = "videoId", alias = "yt:videoId", default)]
    video_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

/// Parse the newest entry of a channel Atom feed.
pub fn parse_feed(xml: &str) -> Result<Option<ListingEntry>, DiscoveryError> {
    let feed: AtomFeed =
        quick_xml::de::from_str(xml).map_err(|e| DiscoveryError::Parse(e.to_string()))?;
    let Some(entry) = feed.entries.into_iter().next() else {
        return Ok(None);
    };
    let video_id = entry
        .video_id
        .filter(|v| !v.trim().is_empty())
        .or_else(|| {
            entry
                .id
                .as_deref()
                .and_then(|id| id.strip_prefix("yt:video:"))
                .map(String::from)
        });
    Ok(video_id.map(|id| ListingEntry::new(entry.title.unwrap_or_default(), id.trim())))
}

/// Reads `feeds/videos.xml?channel_id=UC…` for uploads-playlist sources.
pub struct FeedLister {
    client: Client,
    base_url: String,
}

impl FeedLister {
    pub fn new(timeout: Duration) -> Result<Self, DiscoveryError> {
        Self::with_base_url(DEFAULT_FEED_BASE, timeout)
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DiscoveryError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(FEED_USER_AGENT)
            .no_proxy()
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn feed_url(&self, channel_id: &str) -> String {
        format!("{}/feeds/videos.xml?channel_id={}", self.base_url, channel_id)
    }

    async fn fetch(&self, channel_id: &str) -> Result<String, DiscoveryError> {
        let url = self.feed_url(channel_id);
        debug!("Fetching feed {}", url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DiscoveryError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl Discovery for FeedLister {
    fn name(&self) -> &str {
        "feed"
    }

    async fn latest(&self, source: &str) -> Result<ListingEntry, DiscoveryError> {
        let channel_id =
            channel_id_for_source(source).ok_or_else(|| DiscoveryError::NoChannelId {
                source_id: source.to_string(),
            })?;

        let start = Instant::now();
        let result = self.fetch(&channel_id).await;
        metrics::record_external("feed", "latest", start.elapsed().as_secs_f64(), result.is_ok());

        parse_feed(&result?)?.ok_or_else(|| DiscoveryError::Empty {
            source_id: source.to_string(),
        })
    }

    async fn details(&self, _url: &str) -> Result<ItemDetails, DiscoveryError> {
        Err(DiscoveryError::Unsupported {
            tier: "feed",
            operation: "details",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns:media="http://search.yahoo.com/mrss/" xmlns="http://www.w3.org/2005/Atom">
 <link rel="self" href="http://www.youtube.com/feeds/videos.xml?channel_id=UCDb0peSmF5rLX7BvuTcJfCw"/>
 <id>yt:channel:Db0peSmF5rLX7BvuTcJfCw</id>
 <yt:channelId>UCDb0peSmF5rLX7BvuTcJfCw</yt:channelId>
 <title>Some Channel</title>
 <entry>
  <id>yt:video:AAAAAAAAAAA</id>
  <yt:videoId>AAAAAAAAAAA</yt:videoId>
  <yt:channelId>UCDb0peSmF5rLX7BvuTcJfCw</yt:channelId>
  <title>Newest upload</title>
  <link rel="alternate" href="https://www.youtube.com/watch?v=AAAAAAAAAAA"/>
  <published>2025-01-02T10:00:00+00:00</published>
  <media:group>
   <media:title>Newest upload</media:title>
  </media:group>
 </entry>
 <entry>
  <id>yt:video:BBBBBBBBBBB</id>
  <yt:videoId>BBBBBBBBBBB</yt:videoId>
  <title>Older upload</title>
 </entry>
</feed>"#;

    #[test]
    fn test_uploads_playlist_to_channel() {
        assert_eq!(
            channel_id_for_source("https://www.youtube.com/playlist?list=UUDb0peSmF5rLX7BvuTcJfCw"),
            Some("UCDb0peSmF5rLX7BvuTcJfCw".to_string())
        );
        assert_eq!(
            channel_id_for_source("uu14QT5j2nQI8lKBCGtrrBQA"),
            Some("UC14QT5j2nQI8lKBCGtrrBQA".to_string())
        );
    }

    #[test]
    fn test_non_uploads_source_has_no_channel() {
        assert_eq!(
            channel_id_for_source("https://www.youtube.com/playlist?list=PLDb0peSmF5rLX7BvuTcJfCw"),
            None
        );
        assert_eq!(channel_id_for_source("https://www.youtube.com/@someone"), None);
        assert_eq!(channel_id_for_source(""), None);
    }

    #[test]
    fn test_parse_feed_takes_first_entry() {
        let entry = parse_feed(FEED).unwrap().unwrap();
        assert_eq!(entry.item_id, "AAAAAAAAAAA");
        assert_eq!(entry.title, "Newest upload");
        assert_eq!(entry.canonical_url, "https://www.youtube.com/watch?v=AAAAAAAAAAA");
    }

    #[test]
    fn test_parse_empty_feed() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>x</title></feed>"#;
        assert_eq!(parse_feed(xml).unwrap(), None);
    }

    #[test]
    fn test_feed_url() {
        let lister = FeedLister::with_base_url("http://localhost:9/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            lister.feed_url("UCabc"),
            "http://localhost:9/feeds/videos.xml?channel_id=UCabc"
        );
    }

    #[tokio::test]
    async fn test_latest_without_channel_id_fails_fast() {
        let lister = FeedLister::with_base_url("http://localhost:9", Duration::from_secs(1)).unwrap();
        let err = lister.latest("https://www.youtube.com/@someone").await.unwrap_err();
        assert!(matches!(err, DiscoveryError::NoChannelId { .. }));
    }
}
