//! Error types for the puppet runtime

use crate::protocol::{DecodeError, FrameError};
use crate::spy::{SceneError, SpyError};
use crate::supervisor::{LaunchError, SupervisorError};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for puppet operations
pub type PuppetResult<T> = Result<T, PuppetError>;

/// Main error type for the puppet runtime
#[derive(Error, Debug)]
pub enum PuppetError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The byte stream could not be split into frames
    #[error("Framing error: {0}")]
    Frame(#[from] FrameError),

    /// A single payload failed to decode
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The worker could not be started
    #[error("Launch error: {0}")]
    Launch(#[from] LaunchError),

    /// The worker could not be stopped
    #[error("Supervisor error: {0}")]
    Supervisor(#[from] SupervisorError),

    /// Property observation could not be set up
    #[error("Signal spy error: {0}")]
    Spy(#[from] SpyError),

    /// The scene backend refused an operation
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Captured stream files
    #[error("Capture error: {}: {message}", path.display())]
    Capture { path: PathBuf, message: String },

    /// No echo for a synchronize request
    #[error("Handshake timed out after {waited:?}")]
    HandshakeTimeout { waited: Duration },

    /// The connection task has already exited
    #[error("Channel closed")]
    ChannelClosed,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl PuppetError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a new capture error
    pub fn capture(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Capture {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Stable code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "PUPPET_CONFIG",
            Self::Frame(_) => "PUPPET_FRAMING",
            Self::Decode(_) => "PUPPET_DECODE",
            Self::Launch(_) => "PUPPET_LAUNCH",
            Self::Supervisor(_) => "PUPPET_SUPERVISOR",
            Self::Spy(_) => "PUPPET_SPY",
            Self::Scene(_) => "PUPPET_SCENE",
            Self::Capture { .. } => "PUPPET_CAPTURE",
            Self::HandshakeTimeout { .. } => "PUPPET_HANDSHAKE_TIMEOUT",
            Self::ChannelClosed => "PUPPET_CHANNEL_CLOSED",
            Self::Io(_) => "PUPPET_IO",
            Self::Json(_) => "PUPPET_JSON",
            Self::InvalidInput(_) => "PUPPET_INVALID_INPUT",
        }
    }

    /// Whether relaunching the worker or retrying the request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HandshakeTimeout { .. } | Self::ChannelClosed => true,
            Self::Launch(err) => err.is_retryable(),
            Self::Frame(err) => err.is_transport(),
            Self::Io(_) => true,
            _ => false,
        }
    }
}
