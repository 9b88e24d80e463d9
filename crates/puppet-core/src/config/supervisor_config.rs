//! Worker process supervision configuration

use super::timeouts;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// How the worker binary is located, started and stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Worker executable; `None` means `qmlpuppet` next to the current binary
    pub worker_path: Option<PathBuf>,
    /// Arguments placed before `<address> <mode>`
    pub extra_args: Vec<String>,
    #[serde(with = "humantime_serde")]
    pub startup_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub terminate_grace: Duration,
    pub max_escalations: u32,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            worker_path: None,
            extra_args: Vec::new(),
            startup_timeout: timeouts::supervisor::startup_timeout(),
            terminate_grace: timeouts::supervisor::terminate_grace(),
            max_escalations: timeouts::supervisor::MAX_ESCALATIONS,
        }
    }
}

impl SupervisorConfig {
    /// Resolve the worker executable path
    pub fn resolve_worker_path(&self) -> PathBuf {
        if let Some(path) = &self.worker_path {
            return path.clone();
        }
        let name = format!("qmlpuppet{}", std::env::consts::EXE_SUFFIX);
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(&name)))
            .unwrap_or_else(|| PathBuf::from(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_worker_path_wins() {
        let config = SupervisorConfig {
            worker_path: Some(PathBuf::from("/opt/puppet/bin/qmlpuppet")),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_worker_path(),
            PathBuf::from("/opt/puppet/bin/qmlpuppet")
        );
    }

    #[test]
    fn test_default_worker_path_is_sibling_binary() {
        let path = SupervisorConfig::default().resolve_worker_path();
        let file_name = path.file_name().unwrap().to_string_lossy();
        assert!(file_name.starts_with("qmlpuppet"));
    }
}
