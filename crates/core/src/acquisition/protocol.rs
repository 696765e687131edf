//! Adaptive acquisition of one item.
//!
//! Probe phase: try each client profile for format metadata and select the
//! first one that reveals an HD rendition, else fall back to the last
//! profile. Download phase: the selected profile first, then every other
//! profile in ladder order. The artifact is then checked against the frame
//! ceiling and renamed to `video.mp4` / `cover.png`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::config::AcquisitionConfig;
use super::error::{AcquisitionError, TransportError};
use super::ladder::{first_success, first_success_or_halt, LadderOutcome};
use super::transport::{ProgressObserver, Transport};
use super::types::{
    AcquiredMedia, ClientProfile, ProbeResult, ProfileSelection, SelectionReason, TransferOptions,
    TransferReport,
};
use crate::media::MediaInspector;
use crate::metrics;
use crate::queue::DiscoveredItem;

pub const VIDEO_FILE: &str = "video.mp4";
pub const COVER_FILE: &str = "cover.png";

const VIDEO_EXTS: [&str; 2] = ["mp4", "mkv"];
const CONVERTIBLE_COVER_EXTS: [&str; 3] = ["webp", "jpg", "jpeg"];

/// Live capture limits applied to one acquisition.
pub struct LiveWindow {
    pub cap: Duration,
    pub observer: Arc<dyn ProgressObserver>,
}

/// Why a single probe did not select its profile.
#[derive(Debug)]
enum ProbeMiss {
    NoHd(ProbeResult),
    Failed(TransportError),
}

pub struct AcquisitionProtocol {
    transport: Arc<dyn Transport>,
    inspector: Arc<dyn MediaInspector>,
    config: AcquisitionConfig,
}

impl AcquisitionProtocol {
    pub fn new(
        transport: Arc<dyn Transport>,
        inspector: Arc<dyn MediaInspector>,
        config: AcquisitionConfig,
    ) -> Self {
        Self {
            transport,
            inspector,
            config,
        }
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    /// Acquire `item` into `work_dir`, optionally under live limits.
    pub async fn acquire(
        &self,
        item: &DiscoveredItem,
        work_dir: &Path,
        live: Option<LiveWindow>,
    ) -> Result<AcquiredMedia, AcquisitionError> {
        let result = self.run(item, work_dir, live).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        metrics::ACQUISITIONS.with_label_values(&[outcome]).inc();
        result
    }

    async fn run(
        &self,
        item: &DiscoveredItem,
        work_dir: &Path,
        live: Option<LiveWindow>,
    ) -> Result<AcquiredMedia, AcquisitionError> {
        tokio::fs::create_dir_all(work_dir).await?;

        let mut options = TransferOptions::new(work_dir, item.item_id())
            .with_merge_format(self.config.merge_format.clone())
            .with_source_address(self.config.source_address());
        if let Some(ref window) = live {
            options = options.with_live_window(window.cap);
        }

        let url = item.canonical_url();
        let selection = self.select_profile(url, &options).await;
        let observer = live.map(|w| w.observer);
        let (profile, report) = self.download(url, &selection, &options, observer).await?;

        let video = self
            .locate_output(work_dir, item.item_id(), &report)
            .await
            .ok_or_else(|| AcquisitionError::MissingOutput {
                item_id: item.item_id().to_string(),
            })?;

        self.check_frames(&video).await?;

        match self.inspector.video_summary(&video).await {
            Ok(summary) => info!(item_id = item.item_id(), "Acquired artifact: {}", summary),
            Err(e) => debug!(item_id = item.item_id(), "Video summary unavailable: {}", e),
        }

        let video_path = self.normalize_video(&video, work_dir).await?;
        let cover_path = self.normalize_cover(work_dir, item.item_id()).await;

        let probe = selection.probe.as_ref();
        let title = report
            .title
            .clone()
            .or_else(|| probe.map(|p| p.title.clone()).filter(|t| !t.is_empty()))
            .unwrap_or_else(|| item.title().to_string());
        let description = report
            .description
            .clone()
            .or_else(|| probe.and_then(|p| p.description.clone()))
            .unwrap_or_default()
            .trim()
            .to_string();

        Ok(AcquiredMedia {
            item_id: item.item_id().to_string(),
            title,
            video_path,
            cover_path,
            description,
            source_link: item.canonical_url().to_string(),
            profile: profile.name,
        })
    }

    /// Probe phase. Never fails: with no qualifying profile the last
    /// profile of the ladder is selected.
    pub async fn select_profile(&self, url: &str, options: &TransferOptions) -> ProfileSelection {
        let min_height = self.config.hd_min_height;
        let transport = &self.transport;

        let outcome = first_success(self.config.profiles.iter().cloned(), |profile| async move {
            match transport.probe(url, &profile, options).await {
                Ok(probe) => {
                    let table: Vec<String> = probe.formats.iter().map(|f| f.table_row()).collect();
                    debug!(profile = %profile, "Available formats:\n{}", table.join("\n"));
                    if probe.has_hd(min_height) {
                        Ok(probe)
                    } else {
                        Err(ProbeMiss::NoHd(probe))
                    }
                }
                Err(e) => {
                    debug!(profile = %profile, error = %e, "Probe failed");
                    Err(ProbeMiss::Failed(e))
                }
            }
        })
        .await;

        let selection = match outcome {
            LadderOutcome::Success { key, value, .. } => {
                info!(profile = %key, min_height, "Selected profile with HD rendition");
                ProfileSelection {
                    profile: key,
                    reason: SelectionReason::Hd,
                    probe: Some(value),
                    probe_error: None,
                }
            }
            LadderOutcome::Exhausted { failures } | LadderOutcome::Halted { failures, .. } => {
                let mut fallback = None;
                let mut last_error = None;
                for (_, miss) in failures {
                    match miss {
                        ProbeMiss::NoHd(probe) => {
                            fallback.get_or_insert(probe);
                        }
                        ProbeMiss::Failed(e) => last_error = Some(e.to_string()),
                    }
                }
                let profile = self
                    .config
                    .profiles
                    .last()
                    .cloned()
                    .unwrap_or_else(|| ClientProfile::single("web"));
                info!(profile = %profile, min_height, "No HD rendition found, using best-effort profile");
                ProfileSelection {
                    profile,
                    reason: SelectionReason::BestEffort,
                    probe_error: if fallback.is_none() { last_error } else { None },
                    probe: fallback,
                }
            }
        };

        metrics::PROFILE_SELECTED
            .with_label_values(&[selection.profile.name.as_str(), selection.reason.as_str()])
            .inc();
        selection
    }

    /// Download order: the selected profile, then the rest of the ladder.
    pub fn download_order(&self, selected: &ClientProfile) -> Vec<ClientProfile> {
        std::iter::once(selected.clone())
            .chain(
                self.config
                    .profiles
                    .iter()
                    .filter(|p| *p != selected)
                    .cloned(),
            )
            .collect()
    }

    async fn download(
        &self,
        url: &str,
        selection: &ProfileSelection,
        options: &TransferOptions,
        observer: Option<Arc<dyn ProgressObserver>>,
    ) -> Result<(ClientProfile, TransferReport), AcquisitionError> {
        let transport = &self.transport;
        let observer = &observer;

        let outcome = first_success_or_halt(
            self.download_order(&selection.profile),
            |profile| async move {
                let result = transport
                    .download(url, &profile, options, observer.clone())
                    .await;
                if let Err(ref e) = result {
                    warn!(profile = %profile, error = %e, "Download attempt failed");
                }
                result
            },
            // A capped live capture is over once aborted; retrying another
            // profile would record a second window past the cap.
            TransportError::is_abort,
        )
        .await;

        let attempts = outcome.attempts();
        match outcome {
            LadderOutcome::Success {
                key,
                value,
                failures,
                ..
            } => {
                if !failures.is_empty() {
                    metrics::DOWNLOAD_FALLBACKS.inc_by(failures.len() as u64);
                    info!(profile = %key, attempts, "Download succeeded on fallback profile");
                }
                Ok((key, value))
            }
            LadderOutcome::Halted { error, .. } => Err(AcquisitionError::Download {
                attempts,
                last: error,
            }),
            LadderOutcome::Exhausted { mut failures } => {
                let last = failures
                    .pop()
                    .map(|(_, e)| e)
                    .unwrap_or_else(|| TransportError::failed("no client profiles configured", None));
                match &selection.probe_error {
                    Some(probe) => Err(AcquisitionError::Probe {
                        probe: probe.clone(),
                        download: last,
                    }),
                    None => Err(AcquisitionError::Download { attempts, last }),
                }
            }
        }
    }

    /// Find the merged output by id, then by the paths the transport reported.
    async fn locate_output(
        &self,
        work_dir: &Path,
        item_id: &str,
        report: &TransferReport,
    ) -> Option<PathBuf> {
        for ext in VIDEO_EXTS {
            let candidate = work_dir.join(format!("{}.{}", item_id, ext));
            if exists(&candidate).await {
                return Some(candidate);
            }
        }
        for path in &report.output_files {
            if exists(path).await {
                return Some(path.clone());
            }
        }
        None
    }

    /// Frame-overflow breaker. An unknown count does not trip it.
    async fn check_frames(&self, video: &Path) -> Result<Option<u64>, AcquisitionError> {
        let ceiling = self.config.max_frames;
        match self.inspector.count_frames(video).await {
            Ok(frames) if frames > ceiling => {
                if let Err(e) = tokio::fs::remove_file(video).await {
                    warn!(path = %video.display(), error = %e, "Failed to delete oversized artifact");
                }
                metrics::FRAME_OVERFLOWS.inc();
                warn!(frames, ceiling, "Frame ceiling exceeded, artifact discarded");
                Err(AcquisitionError::FrameOverflow { frames, ceiling })
            }
            Ok(frames) => {
                debug!(frames, ceiling, "Frame count within ceiling");
                Ok(Some(frames))
            }
            Err(e) => {
                warn!(error = %e, "Frame count unavailable, skipping breaker");
                Ok(None)
            }
        }
    }

    async fn normalize_video(&self, video: &Path, work_dir: &Path) -> Result<PathBuf, AcquisitionError> {
        let target = work_dir.join(VIDEO_FILE);
        if video != target {
            move_file(video, &target).await?;
        }
        Ok(target)
    }

    /// Produce `cover.png` from the downloaded thumbnail, if any.
    async fn normalize_cover(&self, work_dir: &Path, item_id: &str) -> Option<PathBuf> {
        let target = work_dir.join(COVER_FILE);

        let png = work_dir.join(format!("{}.png", item_id));
        if exists(&png).await {
            return match move_file(&png, &target).await {
                Ok(()) => Some(target),
                Err(e) => {
                    warn!(error = %e, "Failed to move cover");
                    None
                }
            };
        }

        for ext in CONVERTIBLE_COVER_EXTS {
            let source = work_dir.join(format!("{}.{}", item_id, ext));
            if !exists(&source).await {
                continue;
            }
            return match self.inspector.convert_image(&source, &target).await {
                Ok(()) => Some(target),
                Err(e) => {
                    warn!(error = %e, "Cover conversion to png failed");
                    None
                }
            };
        }

        info!(item_id, "No thumbnail produced, publishing without cover");
        None
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Rename, falling back to copy-and-delete across filesystems.
async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(_) => {
            tokio::fs::copy(from, to).await?;
            tokio::fs::remove_file(from).await
        }
    }
}
