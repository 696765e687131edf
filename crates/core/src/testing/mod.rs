//! Testing utilities and mock implementations of every collaborator seam.
//!
//! The mocks let the whole pipeline run without yt-dlp, ffmpeg, an LLM,
//! Bangumi or the upload tool.
//!
//! # Example
//!
//! ```rust,ignore
//! use mirror_core::testing::{fixtures, MockTransport, MockInspector};
//!
//! let transport = MockTransport::new();
//! transport.set_probe("android", fixtures::probe_with_height("abc", 1080)).await;
//! transport.set_download_failure("web", "HTTP 403").await;
//!
//! let inspector = MockInspector::new();
//! inspector.set_frame_count(250_000).await;
//! ```

mod mock_discovery;
mod mock_enricher;
mod mock_inspector;
mod mock_llm;
mod mock_publisher;
mod mock_translator;
mod mock_transport;
mod recording_maintenance;

pub use mock_discovery::MockDiscovery;
pub use mock_enricher::MockEnricher;
pub use mock_inspector::MockInspector;
pub use mock_llm::MockLlmClient;
pub use mock_publisher::MockPublisher;
pub use mock_translator::MockTranslator;
pub use mock_transport::MockTransport;
pub use recording_maintenance::RecordingMaintenance;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::acquisition::{FormatInfo, ProbeResult};
    use crate::discovery::{watch_url, ItemDetails, LiveStatus};
    use crate::queue::DiscoveredItem;

    /// A finite item titled `title <id>`.
    pub fn finite_item(item_id: &str) -> DiscoveredItem {
        DiscoveredItem::finite(format!("title {}", item_id), item_id, watch_url(item_id))
            .expect("valid fixture item")
    }

    /// A live item capped at `cap_secs`.
    pub fn live_item(item_id: &str, cap_secs: u64) -> DiscoveredItem {
        DiscoveredItem::live(
            format!("live {}", item_id),
            item_id,
            watch_url(item_id),
            cap_secs,
        )
        .expect("valid fixture item")
    }

    /// A probe whose best video rendition is `height` pixels tall.
    pub fn probe_with_height(item_id: &str, height: u32) -> ProbeResult {
        ProbeResult {
            item_id: item_id.to_string(),
            title: format!("title {}", item_id),
            description: Some(format!("description of {}", item_id)),
            formats: vec![
                FormatInfo {
                    format_id: "140".to_string(),
                    has_audio: true,
                    protocol: Some("https".to_string()),
                    note: Some("medium".to_string()),
                    url: Some("https://media.example/audio".to_string()),
                    ..Default::default()
                },
                FormatInfo {
                    format_id: "v".to_string(),
                    height: Some(height),
                    has_video: true,
                    fps: Some(30.0),
                    protocol: Some("https".to_string()),
                    note: Some(format!("{}p", height)),
                    url: Some(format!("https://media.example/video/{}", height)),
                    ..Default::default()
                },
            ],
        }
    }

    /// Finite, not live.
    pub fn finite_details(duration_secs: u64) -> ItemDetails {
        ItemDetails {
            duration_seconds: Some(duration_secs),
            is_live: false,
            live_status: LiveStatus::NotLive,
        }
    }

    pub fn live_details() -> ItemDetails {
        ItemDetails {
            duration_seconds: None,
            is_live: true,
            live_status: LiveStatus::IsLive,
        }
    }
}
