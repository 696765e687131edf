use thiserror::Error;

use crate::llm::LlmError;

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Bangumi returned status {status}")]
    Status { status: u16 },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("No match for '{0}'")]
    NotFound(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}
