//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{
    DispatchConfig, HostConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, SwitchyardConfig,
};

/// Validates the entire configuration.
pub fn validate_config(config: &SwitchyardConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_dispatch_config(&config.dispatch)?;
    validate_host_config(&config.runtime)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    validate_level("logging.level", &logging.level)?;

    for (target, level) in &logging.filters {
        if target.trim().is_empty() {
            return Err(ConfigError::validation("Log filter target cannot be empty"));
        }
        validate_level(&format!("logging.filters.{target}"), level)?;
    }

    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output is \"file\"",
        ));
    }

    if logging.format == LogFormat::Json && !cfg!(feature = "json-log") {
        return Err(ConfigError::validation(
            "JSON log format requires the `json-log` feature",
        ));
    }

    Ok(())
}

fn validate_level(key: &str, level: &str) -> ConfigResult<()> {
    level.parse::<LogLevel>().map(drop).map_err(|_| {
        let valid: Vec<&str> = LogLevel::ALL.iter().map(|l| l.as_str()).collect();
        ConfigError::validation(format!(
            "Invalid log level for {key}: {level}. Valid values are: {valid:?}"
        ))
    })
}

fn validate_dispatch_config(dispatch: &DispatchConfig) -> ConfigResult<()> {
    if dispatch.default_timeout_ms == 0 {
        return Err(ConfigError::validation(
            "dispatch.default_timeout_ms must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_host_config(host: &HostConfig) -> ConfigResult<()> {
    if host.max_line_bytes == 0 {
        return Err(ConfigError::validation(
            "runtime.max_line_bytes must be greater than 0",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&SwitchyardConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = SwitchyardConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_validate_invalid_filter_level() {
        let mut config = SwitchyardConfig::default();
        config
            .logging
            .filters
            .insert("switchyard_framework".to_string(), "loud".to_string());
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("logging.filters.switchyard_framework"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = SwitchyardConfig::default();
        config.dispatch.default_timeout_ms = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_validate_file_output_needs_path() {
        let mut config = SwitchyardConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some("switchyard.log".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_line_limit() {
        let mut config = SwitchyardConfig::default();
        config.runtime.max_line_bytes = 0;
        assert!(validate_config(&config).is_err());
    }
}
