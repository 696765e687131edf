use thiserror::Error;

use crate::llm::LlmError;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// The answer lacks the title or tag line.
    #[error("malformed translation output: {raw}")]
    Malformed { raw: String },

    #[error("translated title is empty")]
    EmptyTitle,
}
