use super::{types::Config, ConfigError};

/// Validate configuration.
///
/// Everything rejected here is fatal at startup; every other failure the
/// agent meets at runtime is contained per source or per task.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.sources.iter().all(|s| s.trim().is_empty()) {
        return Err(ConfigError::ValidationError(
            "at least one source must be registered".to_string(),
        ));
    }

    if config.monitor.poll_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "monitor.poll_interval_secs cannot be 0".to_string(),
        ));
    }

    if config.monitor.live_cap_secs == 0 {
        return Err(ConfigError::ValidationError(
            "monitor.live_cap_secs cannot be 0".to_string(),
        ));
    }

    if config.workers.count == 0 {
        return Err(ConfigError::ValidationError(
            "workers.count cannot be 0".to_string(),
        ));
    }

    if config.workers.queue_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "workers.queue_capacity cannot be 0".to_string(),
        ));
    }

    if config.acquisition.profiles.is_empty() {
        return Err(ConfigError::ValidationError(
            "acquisition.profiles cannot be empty".to_string(),
        ));
    }

    if config.server.enabled && config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    Ok(())
}
