use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides.
///
/// Nested keys are addressed with a double underscore, e.g.
/// `MIRROR_MONITOR__POLL_INTERVAL_SECS=60`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("MIRROR_").split("__").ignore(&["config", "log_format"]))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
sources = ["https://www.youtube.com/playlist?list=UUDb0peSmF5rLX7BvuTcJfCw"]

[monitor]
poll_interval_secs = 60
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.monitor.poll_interval_secs, 60);
    }

    #[test]
    fn test_load_config_from_str_bad_type() {
        let toml = r#"
sources = "not-a-list"
"#;
        let result = load_config_from_str(toml);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
sources = ["UU14QT5j2nQI8lKBCGtrrBQA"]

[workers]
count = 3
queue_capacity = 50
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.workers.count, 3);
        assert_eq!(config.workers.queue_capacity, 50);
        assert_eq!(config.sources, vec!["UU14QT5j2nQI8lKBCGtrrBQA".to_string()]);
    }
}
