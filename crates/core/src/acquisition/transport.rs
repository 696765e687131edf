//! Transport collaborator seam.

use async_trait::async_trait;
use std::sync::Arc;

use super::error::TransportError;
use super::types::{
    ClientProfile, ProbeResult, ProgressControl, TransferOptions, TransferProgress, TransferReport,
};

/// Receives progress during a download and may stop it.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: &TransferProgress) -> ProgressControl;
}

/// Fetches metadata and media for one item reference.
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &str;

    /// Request format metadata only.
    async fn probe(
        &self,
        url: &str,
        profile: &ClientProfile,
        options: &TransferOptions,
    ) -> Result<ProbeResult, TransportError>;

    /// Probe and download into `options.output_dir`.
    ///
    /// When an observer returns [`ProgressControl::Abort`] the transfer is
    /// stopped and [`TransportError::Aborted`] returned.
    async fn download(
        &self,
        url: &str,
        profile: &ClientProfile,
        options: &TransferOptions,
        observer: Option<Arc<dyn ProgressObserver>>,
    ) -> Result<TransferReport, TransportError>;
}
