//! yt-dlp based transport.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::time::Duration;
use tracing::{debug, warn};

use super::config::AcquisitionConfig;
use super::error::TransportError;
use super::transport::{ProgressObserver, Transport};
use super::types::{
    ClientProfile, FormatInfo, ProbeResult, ProgressControl, TransferOptions, TransferProgress,
    TransferReport,
};

/// Proxy variables scrubbed from every child environment.
pub const PROXY_ENV_VARS: [&str; 8] = [
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "ALL_PROXY",
    "NO_PROXY",
    "http_proxy",
    "https_proxy",
    "all_proxy",
    "no_proxy",
];

const PROGRESS_PREFIX: &str = "[progress] ";
const DONE_PREFIX: &str = "[done] ";
const STDERR_TAIL: usize = 4096;

/// Builds a yt-dlp command carrying the network and cookie flags shared by
/// every invocation. With `disable_proxy` the child sees no proxy at all.
pub(crate) fn base_command(
    config: &AcquisitionConfig,
    source_address: Option<&str>,
    disable_proxy: bool,
) -> Command {
    let mut cmd = Command::new(&config.ytdlp_path);
    if disable_proxy {
        for var in PROXY_ENV_VARS {
            cmd.env_remove(var);
        }
    }
    cmd.args(network_args(config, source_address, disable_proxy));
    cmd.stdin(Stdio::null()).kill_on_drop(true);
    cmd
}

fn network_args(
    config: &AcquisitionConfig,
    source_address: Option<&str>,
    disable_proxy: bool,
) -> Vec<String> {
    let mut args = Vec::new();
    if disable_proxy {
        args.extend(["--proxy".to_string(), String::new()]);
    }
    args.extend(["--geo-bypass".to_string(), "--no-warnings".to_string()]);
    if let Some(addr) = source_address {
        args.extend(["--source-address".to_string(), addr.to_string()]);
    }
    if let Some(ref file) = config.cookies_file {
        args.extend(["--cookies".to_string(), file.to_string_lossy().to_string()]);
    } else if let Some(ref browser) = config.cookies_from_browser {
        args.extend(["--cookies-from-browser".to_string(), browser.clone()]);
    }
    args.extend(config.extra_args.iter().cloned());
    args
}

/// Maps a spawn error, recognising a missing binary.
pub(crate) fn spawn_error(e: std::io::Error, path: &std::path::Path) -> TransportError {
    if e.kind() == std::io::ErrorKind::NotFound {
        TransportError::NotFound {
            path: path.to_path_buf(),
        }
    } else {
        TransportError::Io(e)
    }
}

fn tail(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let start = text
        .char_indices()
        .map(|(i, _)| i)
        .find(|&i| text.len() - i <= STDERR_TAIL)
        .unwrap_or(0);
    Some(text[start..].to_string())
}

#[derive(Debug, Deserialize)]
struct InfoJson {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    formats: Vec<InfoFormat>,
}

#[derive(Debug, Deserialize)]
struct InfoFormat {
    #[serde(default)]
    format_id: Option<String>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    vcodec: Option<String>,
    #[serde(default)]
    acodec: Option<String>,
    #[serde(default)]
    fps: Option<f64>,
    #[serde(default)]
    protocol: Option<String>,
    #[serde(default)]
    format_note: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DoneRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    filepath: Option<String>,
}

#[derive(Debug)]
enum StdoutLine {
    Progress(Option<u64>),
    Done(DoneRecord),
    Other,
}

/// yt-dlp transport.
pub struct YtDlpTransport {
    config: AcquisitionConfig,
}

impl YtDlpTransport {
    pub fn new(config: AcquisitionConfig) -> Self {
        Self { config }
    }

    fn extractor_args(&self, profile: &ClientProfile) -> String {
        let mut value = format!(
            "youtube:player_client={};formats=missing_pot",
            profile.clients.join(",")
        );
        if !self.config.po_tokens.is_empty() {
            value.push_str(";po_token=");
            value.push_str(&self.config.po_tokens.join(","));
        }
        value
    }

    fn probe_args(&self, url: &str, profile: &ClientProfile) -> Vec<String> {
        vec![
            "-J".to_string(),
            "--no-playlist".to_string(),
            "--skip-download".to_string(),
            "--extractor-args".to_string(),
            self.extractor_args(profile),
            url.to_string(),
        ]
    }

    fn download_args(
        &self,
        url: &str,
        profile: &ClientProfile,
        options: &TransferOptions,
    ) -> Vec<String> {
        let template = options
            .output_dir
            .join(format!("{}.%(ext)s", options.file_stem));
        let mut args = vec![
            "--no-playlist".to_string(),
            "-f".to_string(),
            self.config.format.clone(),
            "-S".to_string(),
            self.config.format_sort.clone(),
            "--merge-output-format".to_string(),
            options.merge_format.clone(),
            "-o".to_string(),
            template.to_string_lossy().to_string(),
            "--write-thumbnail".to_string(),
            "--convert-thumbnails".to_string(),
            "png".to_string(),
            "--newline".to_string(),
            "--progress".to_string(),
            "--progress-template".to_string(),
            format!("download:{}%(progress.downloaded_bytes)s", PROGRESS_PREFIX),
            "--print".to_string(),
            format!(
                "after_move:{}%(.{{id,title,description,filepath}})j",
                DONE_PREFIX
            ),
        ];
        if let Some(window) = options.live_window {
            args.extend([
                "--download-sections".to_string(),
                format!("*0-{}", window.as_secs()),
                "--hls-use-mpegts".to_string(),
            ]);
        }
        args.extend([
            "--extractor-args".to_string(),
            self.extractor_args(profile),
            url.to_string(),
        ]);
        args
    }

    fn parse_probe(output: &str) -> Result<ProbeResult, TransportError> {
        let info: InfoJson = serde_json::from_str(output)
            .map_err(|e| TransportError::parse(format!("info json: {}", e)))?;
        Ok(ProbeResult {
            item_id: info.id,
            title: info.title.unwrap_or_default(),
            description: info.description,
            formats: info
                .formats
                .into_iter()
                .map(|f| FormatInfo {
                    format_id: f.format_id.unwrap_or_default(),
                    height: f.height,
                    has_video: f.vcodec.as_deref() != Some("none"),
                    has_audio: f.acodec.as_deref() != Some("none"),
                    fps: f.fps.map(|v| v as f32),
                    protocol: f.protocol,
                    note: f.format_note,
                    url: f.url,
                })
                .collect(),
        })
    }

    fn parse_line(line: &str) -> StdoutLine {
        if let Some(rest) = line.strip_prefix(PROGRESS_PREFIX) {
            return StdoutLine::Progress(rest.trim().parse::<u64>().ok());
        }
        if let Some(rest) = line.strip_prefix(DONE_PREFIX) {
            return match serde_json::from_str::<DoneRecord>(rest.trim()) {
                Ok(record) => StdoutLine::Done(record),
                Err(e) => {
                    debug!("Unparseable completion record: {}", e);
                    StdoutLine::Other
                }
            };
        }
        StdoutLine::Other
    }

    fn observe(
        observer: &Option<Arc<dyn ProgressObserver>>,
        start: Instant,
        downloaded_bytes: Option<u64>,
    ) -> bool {
        match observer {
            Some(observer) => {
                let progress = TransferProgress {
                    elapsed: start.elapsed(),
                    downloaded_bytes,
                };
                observer.on_progress(&progress) == ProgressControl::Abort
            }
            None => false,
        }
    }
}

#[async_trait]
impl Transport for YtDlpTransport {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn probe(
        &self,
        url: &str,
        profile: &ClientProfile,
        options: &TransferOptions,
    ) -> Result<ProbeResult, TransportError> {
        let mut cmd = base_command(
            &self.config,
            options.source_address.as_deref(),
            options.disable_proxy,
        );
        cmd.args(self.probe_args(url, profile))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = cmd
            .spawn()
            .map_err(|e| spawn_error(e, &self.config.ytdlp_path))?;
        let timeout_secs = self.config.probe_timeout_secs;
        let output = tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait_with_output())
            .await
            .map_err(|_| TransportError::Timeout { timeout_secs })??;

        if !output.status.success() {
            return Err(TransportError::failed(
                format!("yt-dlp probe exited with code {:?}", output.status.code()),
                tail(&String::from_utf8_lossy(&output.stderr)),
            ));
        }
        Self::parse_probe(&String::from_utf8_lossy(&output.stdout))
    }

    async fn download(
        &self,
        url: &str,
        profile: &ClientProfile,
        options: &TransferOptions,
        observer: Option<Arc<dyn ProgressObserver>>,
    ) -> Result<TransferReport, TransportError> {
        tokio::fs::create_dir_all(&options.output_dir).await?;

        let mut cmd = base_command(
            &self.config,
            options.source_address.as_deref(),
            options.disable_proxy,
        );
        cmd.args(self.download_args(url, profile, options))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| spawn_error(e, &self.config.ytdlp_path))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::failed("stdout not captured", None))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| TransportError::failed("stderr not captured", None))?;
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let start = Instant::now();
        let timeout_secs = self.config.download_timeout_secs;
        let deadline = tokio::time::sleep(Duration::from_secs(timeout_secs));
        tokio::pin!(deadline);
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        let mut lines = BufReader::new(stdout).lines();
        let mut stdout_open = true;
        let mut downloaded_bytes = None;
        let mut report = TransferReport::default();

        let status = loop {
            tokio::select! {
                line = lines.next_line(), if stdout_open => match line {
                    Ok(Some(line)) => match Self::parse_line(&line) {
                        StdoutLine::Progress(bytes) => {
                            downloaded_bytes = bytes.or(downloaded_bytes);
                            if Self::observe(&observer, start, downloaded_bytes) {
                                let _ = child.kill().await;
                                return Err(TransportError::Aborted {
                                    reason: format!("observer stopped transfer after {:?}", start.elapsed()),
                                });
                            }
                        }
                        StdoutLine::Done(record) => {
                            report.item_id = record.id.or(report.item_id);
                            report.title = record.title.or(report.title);
                            report.description = record.description.or(report.description);
                            if let Some(path) = record.filepath {
                                report.output_files.push(PathBuf::from(path));
                            }
                        }
                        StdoutLine::Other => {}
                    },
                    Ok(None) => stdout_open = false,
                    Err(e) => {
                        warn!("Failed to read yt-dlp output: {}", e);
                        stdout_open = false;
                    }
                },
                _ = ticker.tick() => {
                    if Self::observe(&observer, start, downloaded_bytes) {
                        let _ = child.kill().await;
                        return Err(TransportError::Aborted {
                            reason: format!("observer stopped transfer after {:?}", start.elapsed()),
                        });
                    }
                }
                status = child.wait(), if !stdout_open => break status?,
                _ = &mut deadline => {
                    let _ = child.kill().await;
                    return Err(TransportError::Timeout { timeout_secs });
                }
            }
        };

        let stderr_text = tokio::time::timeout(Duration::from_secs(5), stderr_task)
            .await
            .ok()
            .and_then(|r| r.ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(TransportError::failed(
                format!("yt-dlp exited with code {:?}", status.code()),
                tail(&stderr_text),
            ));
        }

        debug!(
            profile = %profile,
            files = report.output_files.len(),
            elapsed_secs = start.elapsed().as_secs(),
            "yt-dlp download finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn transport() -> YtDlpTransport {
        YtDlpTransport::new(AcquisitionConfig::default())
    }

    #[test]
    fn test_network_args_disable_proxy_and_bind_ipv4() {
        let args = network_args(&AcquisitionConfig::default(), Some("0.0.0.0"), true);
        let proxy = args.iter().position(|a| a == "--proxy").unwrap();
        assert_eq!(args[proxy + 1], "");
        let addr = args.iter().position(|a| a == "--source-address").unwrap();
        assert_eq!(args[addr + 1], "0.0.0.0");
        assert!(args.contains(&"--geo-bypass".to_string()));
        assert!(!args.contains(&"--cookies".to_string()));
    }

    #[test]
    fn test_network_args_keep_proxy_when_allowed() {
        let args = network_args(&AcquisitionConfig::default(), None, false);
        assert!(!args.contains(&"--proxy".to_string()));
        assert!(args.contains(&"--geo-bypass".to_string()));
    }

    #[test]
    fn test_cookie_file_preferred_over_browser() {
        let config = AcquisitionConfig {
            cookies_file: Some(PathBuf::from("/etc/cookies.txt")),
            cookies_from_browser: Some("firefox".into()),
            ..Default::default()
        };
        let args = network_args(&config, None, true);
        assert!(args.contains(&"--cookies".to_string()));
        assert!(!args.contains(&"--cookies-from-browser".to_string()));
        assert!(!args.contains(&"--source-address".to_string()));
    }

    #[test]
    fn test_extractor_args_carry_clients_and_tokens() {
        let config = AcquisitionConfig {
            po_tokens: vec!["web+AAA".into(), "mweb+BBB".into()],
            ..Default::default()
        };
        let t = YtDlpTransport::new(config);
        let profile = ClientProfile::new("combined", &["android", "ios"]);
        assert_eq!(
            t.extractor_args(&profile),
            "youtube:player_client=android,ios;formats=missing_pot;po_token=web+AAA,mweb+BBB"
        );
    }

    #[test]
    fn test_download_args_live_window() {
        let options = TransferOptions::new("/work/worker-0", "abc123")
            .with_live_window(Duration::from_secs(1800));
        let args = transport().download_args(
            "https://www.youtube.com/watch?v=abc123",
            &ClientProfile::single("web"),
            &options,
        );
        let sections = args.iter().position(|a| a == "--download-sections").unwrap();
        assert_eq!(args[sections + 1], "*0-1800");
        assert!(args.contains(&"--hls-use-mpegts".to_string()));
        let out = args.iter().position(|a| a == "-o").unwrap();
        assert!(Path::new(&args[out + 1]).ends_with("abc123.%(ext)s"));
        assert_eq!(args.last().unwrap(), "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn test_download_args_finite_has_no_window() {
        let options = TransferOptions::new("/work", "abc");
        let args = transport().download_args("u", &ClientProfile::single("ios"), &options);
        assert!(!args.contains(&"--download-sections".to_string()));
        assert!(args.contains(&"bv*+ba/best".to_string()));
    }

    #[test]
    fn test_parse_probe() {
        let json = r#"{
            "id": "abc123",
            "title": "Trailer",
            "description": "desc",
            "formats": [
                {"format_id": "140", "vcodec": "none", "acodec": "mp4a.40.2", "height": null, "url": "https://a"},
                {"format_id": "137", "vcodec": "avc1", "acodec": "none", "height": 1080, "fps": 30.0, "protocol": "https", "url": "https://v"}
            ]
        }"#;
        let probe = YtDlpTransport::parse_probe(json).unwrap();
        assert_eq!(probe.item_id, "abc123");
        assert_eq!(probe.formats.len(), 2);
        assert!(!probe.formats[0].has_video);
        assert!(probe.formats[0].has_audio);
        assert!(probe.has_hd(720));
        assert!(!probe.has_hd(1440));
    }

    #[test]
    fn test_parse_probe_rejects_garbage() {
        assert!(matches!(
            YtDlpTransport::parse_probe("ERROR: blocked"),
            Err(TransportError::Parse { .. })
        ));
    }

    #[test]
    fn test_parse_stdout_lines() {
        assert!(matches!(
            YtDlpTransport::parse_line("[progress] 1048576"),
            StdoutLine::Progress(Some(1_048_576))
        ));
        assert!(matches!(
            YtDlpTransport::parse_line("[progress] NA"),
            StdoutLine::Progress(None)
        ));
        match YtDlpTransport::parse_line(
            r#"[done] {"id": "abc", "title": "t", "description": null, "filepath": "/w/abc.mp4"}"#,
        ) {
            StdoutLine::Done(record) => {
                assert_eq!(record.id.as_deref(), Some("abc"));
                assert_eq!(record.filepath.as_deref(), Some("/w/abc.mp4"));
            }
            other => panic!("unexpected line: {other:?}"),
        }
        assert!(matches!(
            YtDlpTransport::parse_line("[download] Destination: x"),
            StdoutLine::Other
        ));
    }

    #[test]
    fn test_tail_truncates() {
        let long = "x".repeat(STDERR_TAIL * 2);
        assert_eq!(tail(&long).unwrap().len(), STDERR_TAIL);
        assert_eq!(tail("  "), None);
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let config = AcquisitionConfig {
            ytdlp_path: PathBuf::from("/nonexistent/yt-dlp"),
            ..Default::default()
        };
        let t = YtDlpTransport::new(config);
        let err = t
            .probe(
                "https://www.youtube.com/watch?v=x",
                &ClientProfile::single("web"),
                &TransferOptions::new("/tmp", "x"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::NotFound { .. }));
    }
}
