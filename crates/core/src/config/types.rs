use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::acquisition::AcquisitionConfig;
use crate::enrichment::BangumiConfig;
use crate::llm::{LlmConfig, LlmProvider};
use crate::media::InspectorConfig;
use crate::monitor::MonitorConfig;
use crate::publish::BiliupConfig;
use crate::worker::WorkerPoolConfig;
use crate::workdir::MaintenanceConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Static source registry: playlist URLs or bare uploads-playlist ids.
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub workers: WorkerPoolConfig,
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    #[serde(default)]
    pub media: InspectorConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,
    #[serde(default)]
    pub bangumi: BangumiConfig,
    #[serde(default)]
    pub publish: BiliupConfig,
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Status server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

fn default_port() -> u16 {
    8080
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub source_count: usize,
    pub monitor: MonitorConfig,
    pub workers: WorkerPoolConfig,
    pub acquisition: SanitizedAcquisitionConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<SanitizedLlmConfig>,
    pub bangumi_enabled: bool,
    pub bangumi_token_configured: bool,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAcquisitionConfig {
    pub hd_min_height: u32,
    pub max_frames: u64,
    pub profiles: Vec<String>,
    pub cookies_configured: bool,
    pub po_tokens_configured: bool,
}

/// Sanitized LLM config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedLlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub api_key_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let acquisition = &config.acquisition;
        Self {
            source_count: config.sources.len(),
            monitor: config.monitor.clone(),
            workers: config.workers.clone(),
            acquisition: SanitizedAcquisitionConfig {
                hd_min_height: acquisition.hd_min_height,
                max_frames: acquisition.max_frames,
                profiles: acquisition.profiles.iter().map(|p| p.to_string()).collect(),
                cookies_configured: acquisition.cookies_file.is_some()
                    || acquisition.cookies_from_browser.is_some(),
                po_tokens_configured: !acquisition.po_tokens.is_empty(),
            },
            llm: config.llm.as_ref().map(|l| SanitizedLlmConfig {
                provider: l.provider.clone(),
                model: l.model.clone(),
                api_key_configured: l.api_key.as_ref().is_some_and(|k| !k.is_empty()),
            }),
            bangumi_enabled: config.bangumi.enabled,
            bangumi_token_configured: config.bangumi.token.is_some(),
            server: config.server.clone(),
        }
    }
}
