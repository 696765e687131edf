pub mod acquisition;
pub mod config;
pub mod discovery;
pub mod enrichment;
pub mod llm;
pub mod media;
pub mod metrics;
pub mod monitor;
pub mod publish;
pub mod queue;
pub mod testing;
pub mod translate;
pub mod workdir;
pub mod worker;

pub use acquisition::{
    AcquiredMedia, AcquisitionConfig, AcquisitionError, AcquisitionProtocol, ClientProfile,
    LiveCaptureBridge, Transport, TransportError, YtDlpTransport,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    ServerConfig,
};
pub use discovery::{Discovery, DiscoveryError, FeedLister, TieredDiscovery, YtDlpLister};
pub use enrichment::{BangumiClient, ContextEnricher, Enricher};
pub use llm::{create_client, LlmClient, LlmConfig, LlmError};
pub use media::{FfmpegInspector, MediaInspector};
pub use monitor::{MonitorConfig, MonitorStatus, SourceMonitor, SourceRegistry};
pub use publish::{BiliupPublisher, PublishRequest, Publisher};
pub use queue::{DiscoveredItem, QueueError, Task, TaskQueue};
pub use translate::{LlmTranslator, Translation, Translator};
pub use workdir::{DropCachesHook, MaintenanceHook, NoopMaintenance, WorkDirManager};
pub use worker::{PoolStatus, TaskPipeline, WorkerPool, WorkerPoolConfig};
