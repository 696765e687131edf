//! Primary discovery tier backed by yt-dlp.

use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tracing::debug;

use super::error::DiscoveryError;
use super::feed::playlist_id;
use super::traits::Discovery;
use super::types::{ItemDetails, ListingEntry, LiveStatus};
use crate::acquisition::{base_command, spawn_error, AcquisitionConfig, TransportError};
use crate::metrics;

#[derive(Debug, Deserialize)]
struct FlatPlaylist {
    #[serde(default)]
    entries: Vec<FlatEntry>,
}

#[derive(Debug, Deserialize)]
struct FlatEntry {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WatchMeta {
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    is_live: Option<bool>,
    #[serde(default)]
    live_status: Option<LiveStatus>,
}

/// Lists sources with `--flat-playlist` and reads watch-page metadata.
pub struct YtDlpLister {
    config: AcquisitionConfig,
    timeout: Duration,
}

impl YtDlpLister {
    pub fn new(config: AcquisitionConfig, timeout: Duration) -> Self {
        Self { config, timeout }
    }

    /// Playlist URL for a bare playlist id; URLs pass through.
    pub fn listing_url(source: &str) -> String {
        let source = source.trim();
        if source.starts_with("http://") || source.starts_with("https://") {
            return source.to_string();
        }
        match playlist_id(source) {
            Some(id) if id == source => format!("https://www.youtube.com/playlist?list={}", id),
            _ => source.to_string(),
        }
    }

    fn listing_args(url: &str) -> Vec<String> {
        [
            "-J",
            "--flat-playlist",
            "--playlist-end",
            "1",
            "--retries",
            "10",
            "--extractor-retries",
            "8",
            "--sleep-requests",
            "1",
            url,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn details_args(url: &str) -> Vec<String> {
        [
            "-J",
            "--no-playlist",
            "--skip-download",
            "--ignore-no-formats-error",
            url,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    async fn run_json(&self, args: Vec<String>) -> Result<String, DiscoveryError> {
        let mut cmd = base_command(&self.config, self.config.source_address().as_deref(), true);
        cmd.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());

        let child = cmd.spawn().map_err(|e| {
            match spawn_error(e, &self.config.ytdlp_path) {
                TransportError::NotFound { path } => DiscoveryError::NotFound { path },
                TransportError::Io(e) => DiscoveryError::Io(e),
                other => DiscoveryError::Command {
                    reason: other.to_string(),
                },
            }
        })?;

        let timeout_secs = self.timeout.as_secs();
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| DiscoveryError::Timeout { timeout_secs })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
            return Err(DiscoveryError::Command {
                reason: format!("exit code {:?}: {}", output.status.code(), last.trim()),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn parse_listing(source: &str, json: &str) -> Result<ListingEntry, DiscoveryError> {
        let playlist: FlatPlaylist =
            serde_json::from_str(json).map_err(|e| DiscoveryError::Parse(e.to_string()))?;
        playlist
            .entries
            .into_iter()
            .find_map(|e| {
                let id = e.id.filter(|id| !id.trim().is_empty())?;
                Some(ListingEntry::new(e.title.unwrap_or_default(), id))
            })
            .ok_or_else(|| DiscoveryError::Empty {
                source_id: source.to_string(),
            })
    }

    fn parse_details(json: &str) -> Result<ItemDetails, DiscoveryError> {
        let meta: WatchMeta =
            serde_json::from_str(json).map_err(|e| DiscoveryError::Parse(e.to_string()))?;
        Ok(ItemDetails {
            duration_seconds: meta.duration.filter(|d| *d > 0.0).map(|d| d.round() as u64),
            is_live: meta.is_live.unwrap_or(false),
            live_status: meta.live_status.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl Discovery for YtDlpLister {
    fn name(&self) -> &str {
        "listing"
    }

    async fn latest(&self, source: &str) -> Result<ListingEntry, DiscoveryError> {
        let url = Self::listing_url(source);
        debug!("Listing {}", url);
        let start = Instant::now();
        let result = self.run_json(Self::listing_args(&url)).await;
        metrics::record_external("yt-dlp", "latest", start.elapsed().as_secs_f64(), result.is_ok());
        Self::parse_listing(source, &result?)
    }

    async fn details(&self, url: &str) -> Result<ItemDetails, DiscoveryError> {
        let start = Instant::now();
        let result = self.run_json(Self::details_args(url)).await;
        metrics::record_external("yt-dlp", "details", start.elapsed().as_secs_f64(), result.is_ok());
        Self::parse_details(&result?)
    }
}
