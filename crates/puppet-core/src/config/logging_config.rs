//! Logging configuration

use serde::{Deserialize, Serialize};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), used when `RUST_LOG` is unset
    pub level: String,
    /// Log format (json, pretty, compact)
    pub format: String,
    /// Include the emitting module in each line
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
            with_target: false,
        }
    }
}

impl LoggingConfig {
    /// Merge with another logging config
    pub fn merge(&mut self, other: LoggingConfig) {
        if !other.level.is_empty() {
            self.level = other.level;
        }

        if !other.format.is_empty() {
            self.format = other.format;
        }

        self.with_target = other.with_target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, "compact");
        assert!(!config.with_target);
    }

    #[test]
    fn test_logging_config_merge() {
        let mut config1 = LoggingConfig::default();
        let config2 = LoggingConfig {
            level: "debug".to_string(),
            format: "json".to_string(),
            with_target: true,
        };

        config1.merge(config2);
        assert_eq!(config1.level, "debug");
        assert_eq!(config1.format, "json");
        assert!(config1.with_target);
    }

    #[test]
    fn test_logging_config_merge_empty_strings() {
        let mut config1 = LoggingConfig::default();
        let config2 = LoggingConfig {
            level: String::new(),
            format: String::new(),
            with_target: true,
        };

        config1.merge(config2);
        // Empty strings should not override
        assert_eq!(config1.level, "info");
        assert_eq!(config1.format, "compact");
        assert!(config1.with_target);
    }
}
