//! One task, start to finish: acquire, enrich, translate, publish.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::acquisition::{AcquisitionError, LiveCaptureBridge};
use crate::enrichment::Enricher;
use crate::publish::{PublishError, PublishRequest, Publisher};
use crate::queue::Task;
use crate::translate::{TranslateError, Translator};

/// Why a task did not publish.
#[derive(Debug, Error)]
pub enum TaskFailure {
    #[error("acquisition failed: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("translation failed: {0}")]
    Translation(#[from] TranslateError),

    #[error("translation timed out after {timeout_secs}s")]
    TranslationTimeout { timeout_secs: u64 },

    #[error("publish failed: {0}")]
    Publish(#[from] PublishError),

    #[error("task panicked: {0}")]
    Panic(String),

    #[error("work directory not clean: {0}")]
    WorkDir(String),
}

impl TaskFailure {
    /// Label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskFailure::Acquisition(e) => e.kind(),
            TaskFailure::Translation(_) | TaskFailure::TranslationTimeout { .. } => {
                "translation_failed"
            }
            TaskFailure::Publish(_) => "publish_failed",
            TaskFailure::Panic(_) => "panic",
            TaskFailure::WorkDir(_) => "workdir_dirty",
        }
    }
}

/// A successfully published task.
#[derive(Debug, Clone, Serialize)]
pub struct PublishedTask {
    pub item_id: String,
    pub title: String,
    pub profile: String,
    pub category_id: u32,
}

pub struct TaskPipeline {
    acquirer: Arc<LiveCaptureBridge>,
    enricher: Arc<dyn Enricher>,
    translator: Arc<dyn Translator>,
    publisher: Arc<dyn Publisher>,
    enrichment_timeout: Duration,
    translation_timeout: Duration,
}

impl TaskPipeline {
    pub fn new(
        acquirer: Arc<LiveCaptureBridge>,
        enricher: Arc<dyn Enricher>,
        translator: Arc<dyn Translator>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            acquirer,
            enricher,
            translator,
            publisher,
            enrichment_timeout: Duration::from_secs(180),
            translation_timeout: Duration::from_secs(300),
        }
    }

    pub fn with_timeouts(mut self, enrichment: Duration, translation: Duration) -> Self {
        self.enrichment_timeout = enrichment;
        self.translation_timeout = translation;
        self
    }

    /// Run every stage in order inside `work_dir`.
    ///
    /// Artifacts are left in `work_dir`; the caller owns cleanup.
    pub async fn run(&self, task: &Task, work_dir: &Path) -> Result<PublishedTask, TaskFailure> {
        let item = &task.item;

        let media = self.acquirer.acquire(item, work_dir).await?;
        info!(
            task_id = %task.id,
            item_id = %media.item_id,
            profile = %media.profile,
            cover = media.cover_path.is_some(),
            "Acquisition complete"
        );

        let title = if item.title().trim().is_empty() {
            media.title.clone()
        } else {
            item.title().to_string()
        };

        let context = match tokio::time::timeout(self.enrichment_timeout, self.enricher.context(&title)).await {
            Ok(context) => context,
            Err(_) => {
                warn!(task_id = %task.id, "Enrichment timed out, continuing without context");
                String::new()
            }
        };
        info!(task_id = %task.id, context_chars = context.chars().count(), "Enrichment complete");

        let translation = tokio::time::timeout(
            self.translation_timeout,
            self.translator.translate(&title, &context),
        )
        .await
        .map_err(|_| TaskFailure::TranslationTimeout {
            timeout_secs: self.translation_timeout.as_secs(),
        })??;
        info!(
            task_id = %task.id,
            translated = %translation.title,
            tags = %translation.tags,
            tid = translation.category_id,
            "Translation complete"
        );

        let request = PublishRequest {
            video_path: media.video_path.clone(),
            title: translation.title.clone(),
            description: media.description.clone(),
            tags: translation.tags.clone(),
            cover_path: media.cover_path.clone(),
            source_link: media.source_link.clone(),
            category_id: translation.category_id,
        };
        self.publisher.publish(&request).await?;

        Ok(PublishedTask {
            item_id: media.item_id,
            title: translation.title,
            profile: media.profile,
            category_id: translation.category_id,
        })
    }
}
