//! JSON configuration files

use super::PuppetConfig;
use crate::error::{PuppetError, PuppetResult};
use std::fs;
use std::path::Path;

/// Load a configuration file; missing sections and fields keep their defaults
pub fn load_from_file(path: &Path) -> PuppetResult<PuppetConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        PuppetError::config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        PuppetError::config(format!(
            "Failed to parse config file '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Write a configuration file as pretty JSON
pub fn save_to_file(config: &PuppetConfig, path: &Path) -> PuppetResult<()> {
    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}
