//! LLM client abstraction and the Gemini implementations.
//!
//! Enrichment and translation only need "prompt in, text out". The CLI
//! client is tried first when [`LlmProvider::Fallback`] is configured
//! because it runs against a free OAuth quota; the REST API is the
//! second choice.

mod client;
mod config;
mod fallback;
mod gemini_api;
mod gemini_cli;

pub use client::{CompletionRequest, CompletionResponse, LlmClient, LlmError};
pub use config::{create_client, LlmConfig, LlmProvider};
pub use fallback::FallbackLlmClient;
pub use gemini_api::GeminiApiClient;
pub use gemini_cli::{clean_cli_output, GeminiCliClient};
