//! Process supervision errors

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Why the worker could not be brought up
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("worker binary not found: {}", path.display())]
    BinaryNotFound { path: PathBuf },

    #[error("failed to spawn worker {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("worker exited immediately ({status})")]
    ExitedImmediately { status: String },

    #[error("worker did not connect within {waited:?}")]
    StartupTimeout { waited: Duration },

    #[error("cannot accept worker connection: {0}")]
    Listen(#[source] io::Error),
}

impl LaunchError {
    pub fn spawn(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Self::BinaryNotFound { path }
        } else {
            Self::Spawn { path, source }
        }
    }

    /// Whether another launch attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StartupTimeout { .. } | Self::Spawn { .. })
    }
}

/// Errors while stopping the worker
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Shutdown already ran; the child handle is gone
    #[error("worker already stopped")]
    AlreadyStopped,

    #[error("failed to signal worker {pid}: {message}")]
    Signal { pid: u32, message: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
