use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the worker process is started for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PuppetMode {
    /// Live editing of the form; previews only on request
    Editor,
    /// Renders a preview after every scene change
    Render,
    /// Like `Render`, for the state preview pane
    Preview,
}

impl PuppetMode {
    pub const ALL: [PuppetMode; 3] = [Self::Editor, Self::Render, Self::Preview];

    /// Command-line spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Editor => "editormode",
            Self::Render => "rendermode",
            Self::Preview => "previewmode",
        }
    }

    /// Whether scene changes trigger preview images without a capture request
    pub fn renders_on_change(&self) -> bool {
        !matches!(self, Self::Editor)
    }
}

impl fmt::Display for PuppetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PuppetMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown mode '{}', expected one of editormode, rendermode, previewmode",
                    s
                )
            })
    }
}
