use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("upload tool not found at {path}")]
    NotFound { path: PathBuf },

    #[error("upload failed with exit code {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("upload timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
