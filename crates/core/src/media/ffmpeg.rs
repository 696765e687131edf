//! ffprobe/ffmpeg-based inspector implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use super::config::InspectorConfig;
use super::error::MediaError;
use super::traits::MediaInspector;
use super::types::VideoSummary;

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    codec_name: Option<String>,
    avg_frame_rate: Option<String>,
    nb_read_frames: Option<String>,
}

pub struct FfmpegInspector {
    config: InspectorConfig,
}

impl FfmpegInspector {
    pub fn new(config: InspectorConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(InspectorConfig::default())
    }

    async fn run(
        &self,
        tool: &'static str,
        program: &Path,
        args: &[String],
        timeout_secs: u64,
    ) -> Result<Output, MediaError> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MediaError::ToolNotFound {
                        tool,
                        path: program.to_path_buf(),
                    }
                } else {
                    MediaError::Io(e)
                }
            })?;

        let output = timeout(Duration::from_secs(timeout_secs), child.wait_with_output())
            .await
            .map_err(|_| MediaError::Timeout { tool, timeout_secs })??;

        if !output.status.success() {
            return Err(MediaError::tool_failed(
                tool,
                format!(
                    "exit code {:?}: {}",
                    output.status.code(),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }
        Ok(output)
    }

    fn probe_args(entries: &str, count_frames: bool, path: &Path) -> Vec<String> {
        let mut args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-select_streams".to_string(),
            "v:0".to_string(),
        ];
        if count_frames {
            args.push("-count_frames".to_string());
        }
        args.extend([
            "-show_entries".to_string(),
            format!("stream={}", entries),
            "-of".to_string(),
            "json".to_string(),
            path.to_string_lossy().to_string(),
        ]);
        args
    }

    fn first_stream(output: &str) -> Result<ProbeStream, MediaError> {
        let probe: ProbeOutput = serde_json::from_str(output)
            .map_err(|e| MediaError::parse(format!("Failed to parse ffprobe output: {}", e)))?;
        probe
            .streams
            .into_iter()
            .next()
            .ok_or_else(|| MediaError::parse("no video stream"))
    }

    /// Parses `nb_read_frames` from ffprobe JSON.
    fn parse_frame_count(output: &str) -> Result<u64, MediaError> {
        let stream = Self::first_stream(output)?;
        let raw = stream
            .nb_read_frames
            .ok_or_else(|| MediaError::parse("nb_read_frames missing"))?;
        raw.trim()
            .parse::<u64>()
            .map_err(|e| MediaError::parse(format!("nb_read_frames '{}': {}", raw, e)))
    }

    fn parse_summary(output: &str) -> Result<VideoSummary, MediaError> {
        let stream = Self::first_stream(output)?;
        Ok(VideoSummary {
            width: stream.width,
            height: stream.height,
            codec: stream.codec_name,
            fps: stream.avg_frame_rate.as_deref().and_then(parse_rate),
        })
    }

    fn ensure_exists(path: &Path) -> Result<(), MediaError> {
        if path.exists() {
            Ok(())
        } else {
            Err(MediaError::InputNotFound {
                path: path.to_path_buf(),
            })
        }
    }

    fn ffprobe(&self) -> &PathBuf {
        &self.config.ffprobe_path
    }
}

/// Parse a frame rate like "30000/1001" or "25".
fn parse_rate(rate: &str) -> Option<f32> {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num = num.parse::<f32>().ok()?;
            let den = den.parse::<f32>().ok()?;
            if den > 0.0 {
                Some(num / den)
            } else {
                None
            }
        }
        None => rate.parse::<f32>().ok(),
    }
}

#[async_trait]
impl MediaInspector for FfmpegInspector {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn count_frames(&self, path: &Path) -> Result<u64, MediaError> {
        Self::ensure_exists(path)?;
        let args = Self::probe_args("nb_read_frames", true, path);
        let output = self
            .run(
                "ffprobe",
                self.ffprobe(),
                &args,
                self.config.count_frames_timeout_secs,
            )
            .await?;
        Self::parse_frame_count(&String::from_utf8_lossy(&output.stdout))
    }

    async fn video_summary(&self, path: &Path) -> Result<VideoSummary, MediaError> {
        Self::ensure_exists(path)?;
        let args = Self::probe_args("width,height,codec_name,avg_frame_rate", false, path);
        let output = self
            .run("ffprobe", self.ffprobe(), &args, self.config.timeout_secs)
            .await?;
        Self::parse_summary(&String::from_utf8_lossy(&output.stdout))
    }

    async fn convert_image(&self, input: &Path, output: &Path) -> Result<(), MediaError> {
        Self::ensure_exists(input)?;
        let args = vec![
            "-y".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-frames:v".to_string(),
            "1".to_string(),
            output.to_string_lossy().to_string(),
        ];
        self.run(
            "ffmpeg",
            &self.config.ffmpeg_path,
            &args,
            self.config.timeout_secs,
        )
        .await?;

        if !output.exists() {
            return Err(MediaError::tool_failed("ffmpeg", "output image not created"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_count() {
        let json = r#"{"programs":[],"streams":[{"nb_read_frames":"150000"}]}"#;
        assert_eq!(FfmpegInspector::parse_frame_count(json).unwrap(), 150_000);
    }

    #[test]
    fn test_parse_frame_count_missing_field() {
        let json = r#"{"streams":[{}]}"#;
        assert!(matches!(
            FfmpegInspector::parse_frame_count(json),
            Err(MediaError::ParseError { .. })
        ));
        assert!(FfmpegInspector::parse_frame_count(r#"{"streams":[]}"#).is_err());
        assert!(FfmpegInspector::parse_frame_count("not json").is_err());
    }

    #[test]
    fn test_parse_summary() {
        let json = r#"{"streams":[{"width":1920,"height":1080,"codec_name":"av1","avg_frame_rate":"30000/1001"}]}"#;
        let summary = FfmpegInspector::parse_summary(json).unwrap();
        assert_eq!(summary.width, Some(1920));
        assert_eq!(summary.height, Some(1080));
        assert_eq!(summary.codec.as_deref(), Some("av1"));
        let fps = summary.fps.unwrap();
        assert!((fps - 29.97).abs() < 0.01);
        assert_eq!(summary.to_string(), "1920x1080 codec=av1 fps=29.97");
    }

    #[test]
    fn test_parse_rate_edge_cases() {
        assert_eq!(parse_rate("25"), Some(25.0));
        assert_eq!(parse_rate("0/0"), None);
        assert_eq!(parse_rate("abc"), None);
    }

    #[test]
    fn test_count_frames_args() {
        let args = FfmpegInspector::probe_args("nb_read_frames", true, Path::new("/w/a.mp4"));
        assert!(args.contains(&"-count_frames".to_string()));
        assert!(args.contains(&"stream=nb_read_frames".to_string()));
        assert_eq!(args.last().unwrap(), "/w/a.mp4");
    }

    #[tokio::test]
    async fn test_missing_input() {
        let inspector = FfmpegInspector::with_defaults();
        let err = inspector
            .count_frames(Path::new("/nonexistent/video.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::InputNotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let temp = tempfile::TempDir::new().unwrap();
        let file = temp.path().join("a.mp4");
        tokio::fs::write(&file, b"x").await.unwrap();

        let inspector = FfmpegInspector::new(
            InspectorConfig::default().with_ffprobe_path("/nonexistent/ffprobe"),
        );
        let err = inspector.video_summary(&file).await.unwrap_err();
        assert!(matches!(err, MediaError::ToolNotFound { tool: "ffprobe", .. }));
    }
}
