use std::sync::Arc;
use mirror_core::{Config, SanitizedConfig, SourceMonitor, WorkerPool};

/// Shared application state
pub struct AppState {
    config: Config,
    monitor: Arc<SourceMonitor>,
    pool: Arc<WorkerPool>,
}

impl AppState {
    pub fn new(config: Config, monitor: Arc<SourceMonitor>, pool: Arc<WorkerPool>) -> Self {
        Self {
            config,
            monitor,
            pool,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn monitor(&self) -> &SourceMonitor {
        &self.monitor
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }
}
