//! Environment variable-based configuration overrides

use super::{LoggingConfig, PuppetConfig};
use crate::error::{PuppetError, PuppetResult};
use std::path::PathBuf;

/// Selects distance field text rendering in the worker
pub const ENV_DISTANCE_FIELD: &str = "QMLPUPPET_DISTANCE_FIELD_ANTIALIASING";
/// Path of a JSON configuration file
pub const ENV_CONFIG_FILE: &str = "QMLPUPPET_CONFIG";
/// Capture file for designer -> worker frames
pub const ENV_CAPTURE_COMMANDS: &str = "QMLPUPPET_CAPTURE_COMMANDS";
/// Capture file for worker -> designer frames
pub const ENV_CAPTURE_RESPONSES: &str = "QMLPUPPET_CAPTURE_RESPONSES";
/// Fallback log level when `RUST_LOG` is unset
pub const ENV_LOG_LEVEL: &str = "QMLPUPPET_LOG_LEVEL";
/// Log format (json, pretty, compact)
pub const ENV_LOG_FORMAT: &str = "QMLPUPPET_LOG_FORMAT";
/// Maximum termination signals before the reaper takes over
pub const ENV_MAX_ESCALATIONS: &str = "QMLPUPPET_MAX_ESCALATIONS";

/// Apply overrides from the process environment
pub fn load_from_env(config: &mut PuppetConfig) -> PuppetResult<()> {
    apply_env(config, |key| std::env::var(key).ok())
}

/// Apply overrides read through `lookup`
///
/// Unset variables leave the corresponding field untouched.
pub fn apply_env<F>(config: &mut PuppetConfig, lookup: F) -> PuppetResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(ENV_DISTANCE_FIELD) {
        config.render.distance_field_antialiasing = is_truthy(&value);
    }

    if let Some(path) = non_empty(lookup(ENV_CAPTURE_COMMANDS)) {
        config.capture.command_file = Some(PathBuf::from(path));
    }

    if let Some(path) = non_empty(lookup(ENV_CAPTURE_RESPONSES)) {
        config.capture.response_file = Some(PathBuf::from(path));
    }

    if let Some(value) = non_empty(lookup(ENV_MAX_ESCALATIONS)) {
        config.supervisor.max_escalations = value.parse().map_err(|_| {
            PuppetError::config(format!("Invalid {} value '{}'", ENV_MAX_ESCALATIONS, value))
        })?;
    }

    let logging = LoggingConfig {
        level: lookup(ENV_LOG_LEVEL).unwrap_or_default(),
        format: lookup(ENV_LOG_FORMAT).unwrap_or_default(),
        with_target: config.logging.with_target,
    };
    config.logging.merge(logging);

    Ok(())
}

/// Path named by `QMLPUPPET_CONFIG`, if any
pub fn config_file_from_env() -> Option<PathBuf> {
    non_empty(std::env::var(ENV_CONFIG_FILE).ok()).map(PathBuf::from)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
