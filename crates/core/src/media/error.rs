//! Error types for the media module.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    /// A required binary is not installed.
    #[error("{tool} not found at path: {path}")]
    ToolNotFound { tool: &'static str, path: PathBuf },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// The tool ran but reported failure.
    #[error("{tool} failed: {reason}")]
    ToolFailed { tool: &'static str, reason: String },

    /// The tool did not finish in time.
    #[error("{tool} timed out after {timeout_secs} seconds")]
    Timeout { tool: &'static str, timeout_secs: u64 },

    /// Tool output could not be interpreted.
    #[error("Failed to parse media info: {reason}")]
    ParseError { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    pub fn tool_failed(tool: &'static str, reason: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool,
            reason: reason.into(),
        }
    }

    pub fn parse(reason: impl Into<String>) -> Self {
        Self::ParseError {
            reason: reason.into(),
        }
    }
}
