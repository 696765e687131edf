use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError};

/// Tries each client in order; the first answer wins.
pub struct FallbackLlmClient {
    clients: Vec<Arc<dyn LlmClient>>,
}

impl FallbackLlmClient {
    pub fn new(clients: Vec<Arc<dyn LlmClient>>) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl LlmClient for FallbackLlmClient {
    fn provider(&self) -> &str {
        "fallback"
    }

    fn model(&self) -> &str {
        self.clients.first().map(|c| c.model()).unwrap_or("")
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        if self.clients.is_empty() {
            return Err(LlmError::NotConfigured);
        }
        let mut errors = Vec::new();
        for client in &self.clients {
            match client.complete(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!(provider = client.provider(), error = %e, "LLM provider failed, trying next");
                    errors.push(format!("{}: {}", client.provider(), e));
                }
            }
        }
        Err(LlmError::AllFailed(errors.join("; ")))
    }
}
