//! Configuration for the acquisition protocol.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::types::ClientProfile;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Path to the yt-dlp binary.
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: PathBuf,

    /// Minimum rendition height considered high definition.
    #[serde(default = "default_hd_min_height")]
    pub hd_min_height: u32,

    /// Decoded frame ceiling; larger artifacts are discarded.
    #[serde(default = "default_max_frames")]
    pub max_frames: u64,

    /// Ordered client profile ladder.
    #[serde(default = "ClientProfile::default_ladder")]
    pub profiles: Vec<ClientProfile>,

    /// yt-dlp format selector.
    #[serde(default = "default_format")]
    pub format: String,

    /// yt-dlp format sort order.
    #[serde(default = "default_format_sort")]
    pub format_sort: String,

    #[serde(default = "default_merge_format")]
    pub merge_format: String,

    /// Local address for outgoing connections. Empty disables the flag.
    #[serde(default = "default_source_address")]
    pub source_address: String,

    /// Netscape cookie file passed to yt-dlp.
    #[serde(default)]
    pub cookies_file: Option<PathBuf>,

    /// Browser to read cookies from (e.g. "firefox"), when no cookie file is set.
    #[serde(default)]
    pub cookies_from_browser: Option<String>,

    /// Proof-of-origin tokens forwarded to the YouTube extractor.
    #[serde(default)]
    pub po_tokens: Vec<String>,

    /// Timeout for one probe in seconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Timeout for one download attempt in seconds.
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// Additional yt-dlp arguments appended to every invocation.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_ytdlp_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_hd_min_height() -> u32 {
    720
}

fn default_max_frames() -> u64 {
    200_000
}

fn default_format() -> String {
    "bv*+ba/best".to_string()
}

fn default_format_sort() -> String {
    "res,fps,vcodec:av01,h264,vp9,acodec:m4a,opus".to_string()
}

fn default_merge_format() -> String {
    "mp4".to_string()
}

fn default_source_address() -> String {
    "0.0.0.0".to_string()
}

fn default_probe_timeout() -> u64 {
    120
}

fn default_download_timeout() -> u64 {
    7200
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: default_ytdlp_path(),
            hd_min_height: default_hd_min_height(),
            max_frames: default_max_frames(),
            profiles: ClientProfile::default_ladder(),
            format: default_format(),
            format_sort: default_format_sort(),
            merge_format: default_merge_format(),
            source_address: default_source_address(),
            cookies_file: None,
            cookies_from_browser: None,
            po_tokens: Vec::new(),
            probe_timeout_secs: default_probe_timeout(),
            download_timeout_secs: default_download_timeout(),
            extra_args: Vec::new(),
        }
    }
}

impl AcquisitionConfig {
    pub fn with_profiles(mut self, profiles: Vec<ClientProfile>) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn with_hd_min_height(mut self, height: u32) -> Self {
        self.hd_min_height = height;
        self
    }

    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Source address as an option; empty means "do not bind".
    pub fn source_address(&self) -> Option<String> {
        let addr = self.source_address.trim();
        if addr.is_empty() {
            None
        } else {
            Some(addr.to_string())
        }
    }
}
