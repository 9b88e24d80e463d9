//! Runtime configuration
//!
//! Sources are layered as defaults, then an optional JSON file, then
//! `QMLPUPPET_*` environment variables. The result is validated before use.

mod connection_config;
mod env_loader;
mod file_loader;
mod logging_config;
mod supervisor_config;
mod worker_config;

pub mod timeouts;
pub mod validation;

pub use connection_config::ConnectionConfig;
pub use env_loader::{
    ENV_CAPTURE_COMMANDS, ENV_CAPTURE_RESPONSES, ENV_CONFIG_FILE, ENV_DISTANCE_FIELD,
    ENV_LOG_FORMAT, ENV_LOG_LEVEL, ENV_MAX_ESCALATIONS, apply_env, config_file_from_env,
    load_from_env,
};
pub use file_loader::{load_from_file, save_to_file};
pub use logging_config::LoggingConfig;
pub use supervisor_config::SupervisorConfig;
pub use validation::ConfigValidator;
pub use worker_config::{CaptureConfig, RenderConfig, SpyConfig};

use crate::error::PuppetResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete runtime configuration shared by designer and worker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PuppetConfig {
    pub connection: ConnectionConfig,
    pub supervisor: SupervisorConfig,
    pub capture: CaptureConfig,
    pub spy: SpyConfig,
    pub render: RenderConfig,
    pub logging: LoggingConfig,
}

/// Load configuration: defaults, then `path` (or `QMLPUPPET_CONFIG`), then environment
pub fn load_config(path: Option<&Path>) -> PuppetResult<PuppetConfig> {
    let file = path.map(Path::to_path_buf).or_else(config_file_from_env);
    let mut config = match file {
        Some(file) => {
            tracing::debug!("Loading configuration from {}", file.display());
            load_from_file(&file)?
        }
        None => PuppetConfig::default(),
    };
    load_from_env(&mut config)?;
    ConfigValidator::validate(&config)?;
    Ok(config)
}
