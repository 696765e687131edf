//! `biliup_rs` command line uploader.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info};

use super::config::BiliupConfig;
use super::error::PublishError;
use super::traits::{PublishRequest, Publisher};
use crate::metrics;

pub struct BiliupPublisher {
    config: BiliupConfig,
}

impl BiliupPublisher {
    pub fn new(config: BiliupConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BiliupConfig {
        &self.config
    }

    /// Truncate to the configured number of characters.
    pub fn truncate_description(&self, description: &str) -> String {
        description
            .chars()
            .take(self.config.description_limit)
            .collect()
    }

    pub fn args(&self, request: &PublishRequest) -> Vec<String> {
        let tags = if request.tags.trim().is_empty() {
            self.config.default_tag.clone()
        } else {
            request.tags.clone()
        };

        let mut args = vec![
            "upload".to_string(),
            request.video_path.display().to_string(),
            "--title".to_string(),
            request.title.clone(),
            "--desc".to_string(),
            self.truncate_description(&request.description),
            "--tag".to_string(),
            tags,
            "--tid".to_string(),
            request.category_id.to_string(),
        ];
        if let Some(cover) = &request.cover_path {
            args.push("--cover".to_string());
            args.push(cover.display().to_string());
        }
        args.extend([
            "--limit".to_string(),
            self.config.limit.to_string(),
            "--copyright".to_string(),
            self.config.copyright.to_string(),
            "--source".to_string(),
            request.source_link.clone(),
            "--submit".to_string(),
            self.config.submit.clone(),
        ]);
        args.extend(self.config.extra_args.iter().cloned());
        args
    }

    async fn run(&self, args: Vec<String>) -> Result<(), PublishError> {
        let child = Command::new(&self.config.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    PublishError::NotFound {
                        path: self.config.binary.clone(),
                    }
                } else {
                    PublishError::Io(e)
                }
            })?;

        let timeout_secs = self.config.timeout_secs;
        let output = tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait_with_output())
            .await
            .map_err(|_| PublishError::Timeout { timeout_secs })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            return Err(PublishError::Failed {
                code: output.status.code(),
                stderr: tail.into_iter().rev().collect::<Vec<_>>().join("\n"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Publisher for BiliupPublisher {
    fn name(&self) -> &str {
        "biliup"
    }

    async fn publish(&self, request: &PublishRequest) -> Result<(), PublishError> {
        if !request.video_path.exists() {
            return Err(PublishError::InvalidRequest(format!(
                "video file missing: {}",
                request.video_path.display()
            )));
        }
        if request.title.trim().is_empty() {
            return Err(PublishError::InvalidRequest("empty title".to_string()));
        }

        let args = self.args(request);
        debug!(binary = %self.config.binary.display(), ?args, "Upload command");

        let start = Instant::now();
        let result = self.run(args).await;
        metrics::record_external(
            "biliup",
            "upload",
            start.elapsed().as_secs_f64(),
            result.is_ok(),
        );
        if result.is_ok() {
            info!(title = %request.title, tid = request.category_id, "Upload submitted");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn request(video: PathBuf, cover: Option<PathBuf>) -> PublishRequest {
        PublishRequest {
            video_path: video,
            title: "标题".to_string(),
            description: "d".repeat(2000),
            tags: "tag1,tag2".to_string(),
            cover_path: cover,
            source_link: "https://www.youtube.com/watch?v=abc".to_string(),
            category_id: 51,
        }
    }

    #[test]
    fn test_args_full() {
        let publisher = BiliupPublisher::new(BiliupConfig::default());
        let args = publisher.args(&request(
            PathBuf::from("/w/video.mp4"),
            Some(PathBuf::from("/w/cover.png")),
        ));
        assert_eq!(args[0], "upload");
        assert_eq!(args[1], "/w/video.mp4");
        assert_eq!(args[5].chars().count(), 1800);
        let joined = args.join(" ");
        assert!(joined.contains("--tag tag1,tag2 --tid 51 --cover /w/cover.png"));
        assert!(joined.ends_with(
            "--limit 1 --copyright 2 --source https://www.youtube.com/watch?v=abc --submit app"
        ));
    }

    #[test]
    fn test_args_without_cover_and_tags() {
        let publisher = BiliupPublisher::new(BiliupConfig::default());
        let mut req = request(PathBuf::from("/w/video.mp4"), None);
        req.tags = " ".to_string();
        let args = publisher.args(&req);
        assert!(!args.iter().any(|a| a == "--cover"));
        let tag_pos = args.iter().position(|a| a == "--tag").unwrap();
        assert_eq!(args[tag_pos + 1], "YouTube搬运");
    }

    #[test]
    fn test_truncate_counts_characters() {
        let publisher = BiliupPublisher::new(BiliupConfig {
            description_limit: 3,
            ..Default::default()
        });
        assert_eq!(publisher.truncate_description("芙莉莲的旅途"), "芙莉莲");
    }

    #[tokio::test]
    async fn test_missing_video_rejected() {
        let publisher = BiliupPublisher::new(BiliupConfig::default());
        let err = publisher
            .publish(&request(PathBuf::from("/nonexistent/video.mp4"), None))
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_exit_status_mapping() {
        let dir = TempDir::new().unwrap();
        let video = dir.path().join("video.mp4");
        std::fs::write(&video, b"v").unwrap();

        let ok = BiliupPublisher::new(BiliupConfig::default().with_binary("true"));
        ok.publish(&request(video.clone(), None)).await.unwrap();

        let failing = BiliupPublisher::new(BiliupConfig::default().with_binary("false"));
        assert!(matches!(
            failing.publish(&request(video.clone(), None)).await,
            Err(PublishError::Failed { .. })
        ));

        let missing =
            BiliupPublisher::new(BiliupConfig::default().with_binary("/nonexistent/biliup_rs"));
        assert!(matches!(
            missing.publish(&request(video, None)).await,
            Err(PublishError::NotFound { .. })
        ));
    }
}
