//! Configuration validation

use super::PuppetConfig;
use crate::error::{PuppetError, PuppetResult};
use std::collections::HashSet;
use std::time::Duration;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a complete configuration
    pub fn validate(config: &PuppetConfig) -> PuppetResult<()> {
        Self::validate_connection(config)?;
        Self::validate_supervisor(config)?;
        Self::validate_render(config)?;
        Self::validate_logging(config)?;
        Ok(())
    }

    fn validate_connection(config: &PuppetConfig) -> PuppetResult<()> {
        let connection = &config.connection;
        for (name, value) in [
            ("heartbeat_interval", connection.heartbeat_interval),
            ("liveness_timeout", connection.liveness_timeout),
            ("handshake_timeout", connection.handshake_timeout),
            ("watchdog_tick", connection.watchdog_tick),
        ] {
            if value == Duration::ZERO {
                return Err(PuppetError::config(format!(
                    "connection.{} must be greater than zero",
                    name
                )));
            }
        }

        if connection.liveness_timeout <= connection.heartbeat_interval {
            return Err(PuppetError::config(format!(
                "connection.liveness_timeout ({:?}) must exceed heartbeat_interval ({:?})",
                connection.liveness_timeout, connection.heartbeat_interval
            )));
        }

        Ok(())
    }

    fn validate_supervisor(config: &PuppetConfig) -> PuppetResult<()> {
        let supervisor = &config.supervisor;
        if supervisor.startup_timeout == Duration::ZERO {
            return Err(PuppetError::config(
                "supervisor.startup_timeout must be greater than zero",
            ));
        }
        if supervisor.max_escalations == 0 {
            return Err(PuppetError::config(
                "supervisor.max_escalations must be at least 1",
            ));
        }
        Ok(())
    }

    fn validate_render(config: &PuppetConfig) -> PuppetResult<()> {
        if config.render.preview_width == 0 || config.render.preview_height == 0 {
            return Err(PuppetError::config("render preview size must be non-empty"));
        }
        Ok(())
    }

    /// Validate logging configuration
    pub fn validate_logging(config: &PuppetConfig) -> PuppetResult<()> {
        let valid_levels: HashSet<&str> = ["trace", "debug", "info", "warn", "error"]
            .iter()
            .cloned()
            .collect();

        if !valid_levels.contains(config.logging.level.as_str()) {
            return Err(PuppetError::config(format!(
                "Invalid log level '{}'. Valid levels are: {:?}",
                config.logging.level, valid_levels
            )));
        }

        let valid_formats: HashSet<&str> = ["json", "pretty", "compact"].iter().cloned().collect();

        if !valid_formats.contains(config.logging.format.as_str()) {
            return Err(PuppetError::config(format!(
                "Invalid log format '{}'. Valid formats are: {:?}",
                config.logging.format, valid_formats
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        ConfigValidator::validate(&PuppetConfig::default()).unwrap();
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = PuppetConfig::default();
        config.connection.watchdog_tick = Duration::ZERO;
        let err = ConfigValidator::validate(&config).unwrap_err();
        assert!(err.to_string().contains("watchdog_tick"));
    }

    #[test]
    fn test_liveness_must_exceed_heartbeat() {
        let mut config = PuppetConfig::default();
        config.connection.heartbeat_interval = Duration::from_secs(5);
        config.connection.liveness_timeout = Duration::from_secs(5);
        let err = ConfigValidator::validate(&config).unwrap_err();
        assert!(err.to_string().contains("liveness_timeout"));
    }

    #[test]
    fn test_zero_escalations_rejected() {
        let mut config = PuppetConfig::default();
        config.supervisor.max_escalations = 0;
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let mut config = PuppetConfig::default();
        config.logging.format = "xml".into();
        let err = ConfigValidator::validate_logging(&config).unwrap_err();
        assert!(err.to_string().contains("Invalid log format"));
    }
}
