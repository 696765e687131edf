//! Mock LLM client for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError};

/// Mock implementation of the LlmClient trait.
#[derive(Debug)]
pub struct MockLlmClient {
    name: String,
    answer: Arc<RwLock<Option<String>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockLlmClient {
    /// A client that always answers `text`.
    pub fn answering(name: &str, text: &str) -> Self {
        Self {
            name: name.to_string(),
            answer: Arc::new(RwLock::new(Some(text.to_string()))),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// A client that always fails.
    pub fn failing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            answer: Arc::new(RwLock::new(None)),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn set_answer(&self, text: Option<&str>) {
        *self.answer.write().await = text.map(String::from);
    }

    /// Prompts received, in call order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.write().await.push(request.full_prompt());
        match self.answer.read().await.clone() {
            Some(text) => Ok(CompletionResponse {
                text,
                model: "mock-model".to_string(),
                provider: self.name.clone(),
            }),
            None => Err(LlmError::Http("mock failure".to_string())),
        }
    }
}
