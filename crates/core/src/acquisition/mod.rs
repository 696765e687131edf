//! Acquisition protocol: quality negotiation, download, validation and
//! normalization of one item.
//!
//! - [`AcquisitionProtocol`] runs the probe and download ladders
//! - [`LiveCaptureBridge`] adds the capture cap for live items
//! - [`Transport`] is the seam to the downloader; [`YtDlpTransport`] drives yt-dlp
//! - [`first_success`] is the fallback combinator shared by every ladder

mod config;
mod error;
mod ladder;
mod live;
mod protocol;
mod transport;
mod types;
mod ytdlp;

pub use config::AcquisitionConfig;
pub use error::{AcquisitionError, TransportError};
pub use ladder::{first_success, first_success_or_halt, LadderOutcome};
pub use live::{purge_partials, ElapsedCapObserver, LiveCaptureBridge};
pub use protocol::{AcquisitionProtocol, LiveWindow, COVER_FILE, VIDEO_FILE};
pub use transport::{ProgressObserver, Transport};
pub use types::{
    AcquiredMedia, ClientProfile, FormatInfo, ProbeResult, ProfileSelection, ProgressControl,
    SelectionReason, TransferOptions, TransferProgress, TransferReport,
};
pub use ytdlp::{YtDlpTransport, PROXY_ENV_VARS};

pub(crate) use ytdlp::{base_command, spawn_error};
