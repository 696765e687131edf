//! Error types for the acquisition module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a transport collaborator for a single attempt.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Transport binary not found.
    #[error("transport binary not found at path: {path}")]
    NotFound { path: PathBuf },

    /// The transport ran and failed.
    #[error("transport failed: {reason}")]
    Failed {
        reason: String,
        stderr: Option<String>,
    },

    #[error("transport timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// A progress observer stopped the transfer.
    #[error("transfer aborted: {reason}")]
    Aborted { reason: String },

    /// Transport output could not be interpreted.
    #[error("failed to parse transport output: {reason}")]
    Parse { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    pub fn failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
            stderr,
        }
    }

    pub fn parse(reason: impl Into<String>) -> Self {
        Self::Parse {
            reason: reason.into(),
        }
    }

    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

/// Errors raised by the acquisition protocol for one item.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// No profile produced a probe and the best-effort download failed too.
    #[error("probe failed on every profile ({probe}); best-effort download failed: {download}")]
    Probe {
        probe: String,
        download: TransportError,
    },

    /// Every download attempt failed, or a live capture was aborted.
    #[error("download failed after {attempts} attempt(s): {last}")]
    Download {
        attempts: usize,
        last: TransportError,
    },

    /// The artifact decoded to more frames than allowed.
    #[error("frame count {frames} exceeds ceiling {ceiling}; artifact discarded")]
    FrameOverflow { frames: u64, ceiling: u64 },

    /// The download reported success but no merged output was found.
    #[error("no merged output found for item {item_id}")]
    MissingOutput { item_id: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AcquisitionError {
    /// True when a live capture hit its cap.
    pub fn is_live_abort(&self) -> bool {
        matches!(self, Self::Download { last, .. } if last.is_abort())
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Probe { .. } => "probe_failed",
            Self::Download { last, .. } if last.is_abort() => "live_aborted",
            Self::Download { .. } => "download_failed",
            Self::FrameOverflow { .. } => "frame_overflow",
            Self::MissingOutput { .. } => "missing_output",
            Self::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let abort = AcquisitionError::Download {
            attempts: 1,
            last: TransportError::Aborted {
                reason: "cap".into(),
            },
        };
        assert!(abort.is_live_abort());
        assert_eq!(abort.kind(), "live_aborted");

        let failed = AcquisitionError::Download {
            attempts: 5,
            last: TransportError::failed("403", None),
        };
        assert!(!failed.is_live_abort());
        assert_eq!(failed.kind(), "download_failed");

        let overflow = AcquisitionError::FrameOverflow {
            frames: 250_000,
            ceiling: 200_000,
        };
        assert_eq!(overflow.kind(), "frame_overflow");
        assert!(overflow.to_string().contains("250000"));
    }
}
