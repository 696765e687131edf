//! Media inspection for acquired artifacts.
//!
//! Provides the `MediaInspector` trait and an ffprobe/ffmpeg implementation
//! used by the acquisition protocol for:
//!
//! - Decoded frame counting (the frame-overflow breaker)
//! - A one-line video summary logged after download
//! - Thumbnail conversion to PNG

mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use config::InspectorConfig;
pub use error::MediaError;
pub use ffmpeg::FfmpegInspector;
pub use traits::MediaInspector;
pub use types::VideoSummary;
