use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Lister binary not found.
    #[error("lister binary not found at path: {path}")]
    NotFound { path: PathBuf },

    /// The lister command failed.
    #[error("listing command failed: {reason}")]
    Command { reason: String },

    #[error("discovery timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },

    #[error("failed to parse discovery output: {0}")]
    Parse(String),

    /// The source listing had no usable entry.
    #[error("no entries for source {source_id}")]
    Empty { source_id: String },

    /// No alternate channel id can be derived from the source.
    #[error("no channel id derivable from source {source_id}")]
    NoChannelId { source_id: String },

    /// This tier cannot answer the request.
    #[error("{tier} does not support {operation}")]
    Unsupported {
        tier: &'static str,
        operation: &'static str,
    },

    /// Every tier failed.
    #[error("all discovery tiers failed: {}", .errors.join("; "))]
    AllTiersFailed { errors: Vec<String> },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
