use async_trait::async_trait;
use std::time::Duration;

/// Error type for LLM operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("CLI not found at {0}")]
    CliNotFound(String),

    #[error("CLI exited with {code:?}: {stderr}")]
    CliFailed { code: Option<i32>, stderr: String },

    #[error("Prompt blocked: {0}")]
    Blocked(String),

    #[error("Empty response")]
    Empty,

    #[error("Not configured")]
    NotConfigured,

    #[error("All providers failed: {0}")]
    AllFailed(String),
}

/// Request for a completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt (instructions for the model)
    pub system: Option<String>,
    /// User message
    pub prompt: String,
    /// Temperature (0.0 = deterministic, 1.0 = creative)
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// The prompt as a single text block, system instructions first.
    pub fn full_prompt(&self) -> String {
        match &self.system {
            Some(system) => format!("{}\n\n{}", system, self.prompt),
            None => self.prompt.clone(),
        }
    }
}

/// Response from a completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// The generated text, trimmed.
    pub text: String,
    /// Model used
    pub model: String,
    /// Provider that answered
    pub provider: String,
}

/// Trait for LLM clients.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Provider name (e.g., "gemini-cli", "gemini-api")
    fn provider(&self) -> &str;

    /// Model name (e.g., "gemini-2.5-pro")
    fn model(&self) -> &str;

    /// Send a completion request and get a text response.
    ///
    /// An empty answer is an error, never an empty `text`.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}
