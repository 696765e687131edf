//! Mock transport for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::fixtures;
use crate::acquisition::{
    ClientProfile, ProbeResult, ProgressControl, ProgressObserver, TransferOptions,
    TransferProgress, TransferReport, Transport, TransportError,
};

#[derive(Debug)]
struct TransportState {
    probes: HashMap<String, ProbeResult>,
    probe_errors: HashMap<String, String>,
    download_failures: HashMap<String, String>,
    write_outputs: bool,
    write_cover: bool,
    output_ext: String,
    /// Elapsed times fed to a live observer, in order.
    live_ticks: Vec<Duration>,
    download_delay: Option<Duration>,
    probe_calls: Vec<String>,
    /// Entries already in the output directory when each probe ran.
    probe_dir_entries: Vec<usize>,
    download_calls: Vec<String>,
    download_options: Vec<TransferOptions>,
}

/// Mock implementation of the Transport trait.
///
/// Profiles without a configured probe answer with a 360p probe. A
/// successful download writes `<stem>.mp4` and a `<stem>.webp` thumbnail
/// into the output directory, like the real transport does.
#[derive(Debug)]
pub struct MockTransport {
    state: Arc<RwLock<TransportState>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(TransportState {
                probes: HashMap::new(),
                probe_errors: HashMap::new(),
                download_failures: HashMap::new(),
                write_outputs: true,
                write_cover: true,
                output_ext: "mp4".to_string(),
                live_ticks: vec![Duration::ZERO],
                download_delay: None,
                probe_calls: Vec::new(),
                probe_dir_entries: Vec::new(),
                download_calls: Vec::new(),
                download_options: Vec::new(),
            })),
        }
    }

    pub async fn set_probe(&self, profile: &str, probe: ProbeResult) {
        self.state
            .write()
            .await
            .probes
            .insert(profile.to_string(), probe);
    }

    pub async fn set_probe_error(&self, profile: &str, message: &str) {
        self.state
            .write()
            .await
            .probe_errors
            .insert(profile.to_string(), message.to_string());
    }

    pub async fn set_download_failure(&self, profile: &str, message: &str) {
        self.state
            .write()
            .await
            .download_failures
            .insert(profile.to_string(), message.to_string());
    }

    /// When false, downloads succeed without writing any file.
    pub async fn set_write_outputs(&self, write: bool) {
        self.state.write().await.write_outputs = write;
    }

    pub async fn set_write_cover(&self, write: bool) {
        self.state.write().await.write_cover = write;
    }

    pub async fn set_output_ext(&self, ext: &str) {
        self.state.write().await.output_ext = ext.to_string();
    }

    /// Elapsed times reported to the progress observer during a download.
    pub async fn set_live_ticks(&self, ticks: Vec<Duration>) {
        self.state.write().await.live_ticks = ticks;
    }

    /// Make every download take at least `delay`.
    pub async fn set_download_delay(&self, delay: Duration) {
        self.state.write().await.download_delay = Some(delay);
    }

    /// Profile names probed, in call order.
    pub async fn probe_calls(&self) -> Vec<String> {
        self.state.read().await.probe_calls.clone()
    }

    pub async fn probe_dir_entries(&self) -> Vec<usize> {
        self.state.read().await.probe_dir_entries.clone()
    }

    /// Profile names downloaded with, in call order.
    pub async fn download_calls(&self) -> Vec<String> {
        self.state.read().await.download_calls.clone()
    }

    pub async fn download_options(&self) -> Vec<TransferOptions> {
        self.state.read().await.download_options.clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(
        &self,
        _url: &str,
        profile: &ClientProfile,
        options: &TransferOptions,
    ) -> Result<ProbeResult, TransportError> {
        let mut entries = 0;
        if let Ok(mut dir) = tokio::fs::read_dir(&options.output_dir).await {
            while let Ok(Some(_)) = dir.next_entry().await {
                entries += 1;
            }
        }

        let mut state = self.state.write().await;
        state.probe_calls.push(profile.name.clone());
        state.probe_dir_entries.push(entries);
        if let Some(message) = state.probe_errors.get(&profile.name) {
            return Err(TransportError::failed(message.clone(), None));
        }
        Ok(state
            .probes
            .get(&profile.name)
            .cloned()
            .unwrap_or_else(|| fixtures::probe_with_height(&options.file_stem, 360)))
    }

    async fn download(
        &self,
        _url: &str,
        profile: &ClientProfile,
        options: &TransferOptions,
        observer: Option<Arc<dyn ProgressObserver>>,
    ) -> Result<TransferReport, TransportError> {
        let (failure, write_outputs, write_cover, ext, ticks, delay) = {
            let mut state = self.state.write().await;
            state.download_calls.push(profile.name.clone());
            state.download_options.push(options.clone());
            (
                state.download_failures.get(&profile.name).cloned(),
                state.write_outputs,
                state.write_cover,
                state.output_ext.clone(),
                state.live_ticks.clone(),
                state.download_delay,
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = failure {
            return Err(TransportError::failed(message, Some("ERROR: mock".to_string())));
        }

        let dir = &options.output_dir;
        let stem = &options.file_stem;
        tokio::fs::create_dir_all(dir).await?;

        if let Some(observer) = observer {
            for elapsed in ticks {
                let progress = TransferProgress {
                    elapsed,
                    downloaded_bytes: Some(elapsed.as_secs() * 1024),
                };
                if observer.on_progress(&progress) == ProgressControl::Abort {
                    tokio::fs::write(dir.join(format!("{}.{}.part", stem, ext)), b"partial").await?;
                    return Err(TransportError::Aborted {
                        reason: format!("observer stopped transfer at {}s", elapsed.as_secs()),
                    });
                }
            }
        }

        let mut output_files = Vec::new();
        if write_outputs {
            let video = dir.join(format!("{}.{}", stem, ext));
            tokio::fs::write(&video, b"video").await?;
            output_files.push(video);
            if write_cover {
                tokio::fs::write(dir.join(format!("{}.webp", stem)), b"thumb").await?;
            }
        }

        Ok(TransferReport {
            item_id: Some(stem.clone()),
            title: None,
            description: Some(format!("description of {}", stem)),
            output_files,
        })
    }
}
