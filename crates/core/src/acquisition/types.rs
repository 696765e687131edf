//! Types for the acquisition protocol.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// A named set of upstream player clients used to negotiate formats.
///
/// Profiles are tried in configuration order, which is ordered by how
/// reliably each one reveals high-definition renditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientProfile {
    pub name: String,
    pub clients: Vec<String>,
}

impl ClientProfile {
    pub fn new(name: impl Into<String>, clients: &[&str]) -> Self {
        Self {
            name: name.into(),
            clients: clients.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Single-client profile named after its client.
    pub fn single(client: &str) -> Self {
        Self::new(client, &[client])
    }

    /// The default ladder: web, android, ios, mweb, then all four combined.
    pub fn default_ladder() -> Vec<Self> {
        vec![
            Self::single("web"),
            Self::single("android"),
            Self::single("ios"),
            Self::single("mweb"),
            Self::new("combined", &["android", "ios", "mweb", "web"]),
        ]
    }
}

impl fmt::Display for ClientProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.name, self.clients.join(","))
    }
}

/// One rendition reported by a probe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatInfo {
    pub format_id: String,
    pub height: Option<u32>,
    pub has_video: bool,
    pub has_audio: bool,
    pub fps: Option<f32>,
    pub protocol: Option<String>,
    pub note: Option<String>,
    /// Direct transfer URL, when the upstream resolved one.
    pub url: Option<String>,
}

impl FormatInfo {
    /// A video rendition at least `min_height` tall with a resolvable URL.
    pub fn is_hd(&self, min_height: u32) -> bool {
        self.has_video
            && self.height.is_some_and(|h| h >= min_height)
            && self.url.as_deref().is_some_and(|u| !u.is_empty())
    }

    /// Formats-table row for debug logs.
    pub fn table_row(&self) -> String {
        format!(
            "{:>5}  {:>4}p  v={} a={}  fps={}  proto={}  note={}",
            self.format_id,
            self.height
                .map(|h| h.to_string())
                .unwrap_or_else(|| "None".into()),
            self.has_video,
            self.has_audio,
            self.fps
                .map(|f| f.to_string())
                .unwrap_or_else(|| "None".into()),
            self.protocol.as_deref().unwrap_or("None"),
            self.note.as_deref().unwrap_or("None"),
        )
    }
}

/// Metadata-only result of probing one item with one profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub item_id: String,
    pub title: String,
    pub description: Option<String>,
    pub formats: Vec<FormatInfo>,
}

impl ProbeResult {
    pub fn has_hd(&self, min_height: u32) -> bool {
        self.formats.iter().any(|f| f.is_hd(min_height))
    }
}

/// Options passed to the transport for one probe or download.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferOptions {
    /// Directory all outputs must land in.
    pub output_dir: PathBuf,
    /// Stem of every output file; outputs are named `<stem>.<ext>`.
    pub file_stem: String,
    /// Container for merged audio/video.
    pub merge_format: String,
    /// Request only the first N of a live stream.
    pub live_window: Option<Duration>,
    /// Ignore any configured or ambient proxy.
    pub disable_proxy: bool,
    /// Local address to bind outgoing connections to.
    pub source_address: Option<String>,
}

impl TransferOptions {
    pub fn new(output_dir: impl Into<PathBuf>, file_stem: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            file_stem: file_stem.into(),
            merge_format: "mp4".to_string(),
            live_window: None,
            disable_proxy: true,
            source_address: Some("0.0.0.0".to_string()),
        }
    }

    pub fn with_merge_format(mut self, format: impl Into<String>) -> Self {
        self.merge_format = format.into();
        self
    }

    pub fn with_live_window(mut self, window: Duration) -> Self {
        self.live_window = Some(window);
        self
    }

    pub fn with_source_address(mut self, address: Option<String>) -> Self {
        self.source_address = address;
        self
    }
}

/// What the transport reports after a successful download.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferReport {
    pub item_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Final file paths as reported by the transport.
    pub output_files: Vec<PathBuf>,
}

/// Progress snapshot delivered to observers during a download.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferProgress {
    /// Time since the transfer started.
    pub elapsed: Duration,
    pub downloaded_bytes: Option<u64>,
}

/// Observer verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressControl {
    Continue,
    Abort,
}

/// Why a profile was selected by the probe phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionReason {
    /// The profile revealed a rendition at or above the HD threshold.
    Hd,
    /// No profile qualified; the last profile of the ladder was taken.
    BestEffort,
}

impl SelectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hd => "hd",
            Self::BestEffort => "best_effort",
        }
    }
}

/// Result of the probe phase.
#[derive(Debug, Clone)]
pub struct ProfileSelection {
    pub profile: ClientProfile,
    pub reason: SelectionReason,
    /// The qualifying probe, or the first successful one as fallback.
    pub probe: Option<ProbeResult>,
    /// Last probe error when no profile produced any probe.
    pub probe_error: Option<String>,
}

/// A normalized artifact, ready for the publish collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquiredMedia {
    pub item_id: String,
    pub title: String,
    pub video_path: PathBuf,
    pub cover_path: Option<PathBuf>,
    pub description: String,
    pub source_link: String,
    /// Name of the profile that downloaded the artifact.
    pub profile: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(height: Option<u32>, video: bool, url: Option<&str>) -> FormatInfo {
        FormatInfo {
            format_id: "137".into(),
            height,
            has_video: video,
            has_audio: false,
            url: url.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_is_hd_requires_video_height_and_url() {
        assert!(format(Some(720), true, Some("https://cdn/x")).is_hd(720));
        assert!(format(Some(1080), true, Some("https://cdn/x")).is_hd(720));
        assert!(!format(Some(480), true, Some("https://cdn/x")).is_hd(720));
        assert!(!format(Some(1080), false, Some("https://cdn/x")).is_hd(720));
        assert!(!format(Some(1080), true, None).is_hd(720));
        assert!(!format(Some(1080), true, Some("")).is_hd(720));
        assert!(!format(None, true, Some("https://cdn/x")).is_hd(720));
    }

    #[test]
    fn test_default_ladder_order() {
        let ladder = ClientProfile::default_ladder();
        let names: Vec<_> = ladder.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["web", "android", "ios", "mweb", "combined"]);
        assert_eq!(ladder[4].clients.len(), 4);
        assert_eq!(ladder[0].to_string(), "web[web]");
    }

    #[test]
    fn test_table_row() {
        let row = format(Some(1080), true, Some("u")).table_row();
        assert!(row.contains("1080p"));
        assert!(row.contains("v=true a=false"));
    }
}
