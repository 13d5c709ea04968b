//! Replay configuration (`~/.config/blockly-replay/config.ron`).
//!
//! ```ron
//! (
//!     max_undo: 256,
//!     rendered: true,
//!     filter_on_replay: false,
//! )
//! ```
//!
//! Every field is optional.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use blockly_events::DEFAULT_MAX_UNDO;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReplayConfig {
    /// Undo history depth.
    pub max_undo: usize,
    /// Treat the workspace as rendered, so snapshots carry positions.
    pub rendered: bool,
    /// Deliver the whole log as one batch through the merge filter. When
    /// off, every record is delivered (and recorded for undo) on its own.
    pub filter_on_replay: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            max_undo: DEFAULT_MAX_UNDO,
            rendered: false,
            filter_on_replay: true,
        }
    }
}

/// Default config location, if the platform has a config directory.
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("blockly-replay").join("config.ron"))
}

impl ReplayConfig {
    pub fn from_ron(text: &str) -> Result<Self> {
        ron::from_str(text).context("invalid replay config")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_ron(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Load from an explicit path (which must exist), else from the default
    /// location if present, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match config_file_path() {
            Some(path) if path.exists() => {
                tracing::info!(path = %path.display(), "loading replay config");
                Self::from_file(&path)
            }
            _ => {
                tracing::debug!("no replay config, using defaults");
                Ok(Self::default())
            }
        }
    }
}
