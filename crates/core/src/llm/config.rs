use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::{FallbackLlmClient, GeminiApiClient, GeminiCliClient, LlmClient};

/// Which LLM backend answers prompts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    /// The `gemini` command line tool only.
    GeminiCli,
    /// The Gemini REST API only.
    GeminiApi,
    /// CLI first, REST API when the CLI fails.
    #[default]
    Fallback,
}

/// LLM configuration (the `[llm]` section).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    #[serde(default = "default_model")]
    pub model: String,
    /// Gemini API key. Without it the REST client is skipped.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_cli_path")]
    pub cli_path: PathBuf,
    /// Pass `--sandbox` to the CLI.
    #[serde(default)]
    pub sandbox: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_cli_path() -> PathBuf {
    PathBuf::from("gemini")
}

fn default_timeout_secs() -> u64 {
    90
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: default_model(),
            api_key: None,
            cli_path: default_cli_path(),
            sandbox: false,
            timeout_secs: default_timeout_secs(),
            api_base: default_api_base(),
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    fn cli_client(&self) -> GeminiCliClient {
        GeminiCliClient::new(self.cli_path.clone(), &self.model)
            .with_sandbox(self.sandbox)
            .with_timeout(self.timeout())
    }

    fn api_client(&self) -> Option<GeminiApiClient> {
        self.api_key().map(|key| {
            GeminiApiClient::new(key, &self.model)
                .with_api_base(&self.api_base)
                .with_timeout(self.timeout())
        })
    }
}

/// Build the client the configuration asks for.
///
/// A missing API key downgrades `GeminiApi` and `Fallback` to the CLI alone.
pub fn create_client(config: &LlmConfig) -> Arc<dyn LlmClient> {
    match (&config.provider, config.api_client()) {
        (LlmProvider::GeminiCli, _) | (_, None) => Arc::new(config.cli_client()),
        (LlmProvider::GeminiApi, Some(api)) => Arc::new(api),
        (LlmProvider::Fallback, Some(api)) => Arc::new(FallbackLlmClient::new(vec![
            Arc::new(config.cli_client()),
            Arc::new(api),
        ])),
    }
}
