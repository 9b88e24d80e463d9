//! Worker-side configuration: capture files, spy and rendering

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Files that record the raw frames of a session
///
/// "Commands" always flow designer -> worker and "responses" worker ->
/// designer, whichever side does the recording.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub command_file: Option<PathBuf>,
    pub response_file: Option<PathBuf>,
}

impl CaptureConfig {
    pub fn is_enabled(&self) -> bool {
        self.command_file.is_some() || self.response_file.is_some()
    }
}

/// Property observation options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpyConfig {
    /// Report list elements as `name/<index>/child` instead of `name/child`
    pub index_list_elements: bool,
}

/// Preview rendering options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Distance field text rendering instead of gray-scale antialiasing
    pub distance_field_antialiasing: bool,
    pub preview_width: u32,
    pub preview_height: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            distance_field_antialiasing: false,
            preview_width: 64,
            preview_height: 64,
        }
    }
}
