//! Mock publisher for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::publish::{PublishError, PublishRequest, Publisher};

#[derive(Debug, Default)]
struct PublisherState {
    requests: Vec<PublishRequest>,
    failure: Option<String>,
    panic: bool,
}

/// Mock implementation of the Publisher trait.
///
/// Like the real uploader it rejects requests whose video file is missing.
#[derive(Debug, Default)]
pub struct MockPublisher {
    state: Arc<RwLock<PublisherState>>,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every upload exit non-zero with `stderr`.
    pub async fn set_failure(&self, stderr: &str) {
        self.state.write().await.failure = Some(stderr.to_string());
    }

    /// Make every upload panic.
    pub async fn set_panic(&self, panic: bool) {
        self.state.write().await.panic = panic;
    }

    /// Requests received, in call order.
    pub async fn requests(&self) -> Vec<PublishRequest> {
        self.state.read().await.requests.clone()
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn publish(&self, request: &PublishRequest) -> Result<(), PublishError> {
        let (failure, panic) = {
            let mut state = self.state.write().await;
            state.requests.push(request.clone());
            (state.failure.clone(), state.panic)
        };

        if panic {
            panic!("mock publisher panic");
        }
        if !request.video_path.exists() {
            return Err(PublishError::InvalidRequest(format!(
                "video file missing: {}",
                request.video_path.display()
            )));
        }
        match failure {
            Some(stderr) => Err(PublishError::Failed {
                code: Some(1),
                stderr,
            }),
            None => Ok(()),
        }
    }
}
