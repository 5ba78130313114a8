// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline configuration stored as RON.

use crate::error::ConfigError;
use crate::step::Easing;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serializable timeline settings.
///
/// Callbacks cannot be configured from a file; attach them to the
/// [`TimelineOptions`](crate::TimelineOptions) built from this config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Restart from the first step after every completed pass
    pub repeat: bool,
    /// Pause between a completed pass and the next one, in milliseconds
    pub repeat_delay_ms: u64,
    /// Easing for steps that do not name one
    pub default_easing: Option<Easing>,
}

impl TimelineConfig {
    /// Parse a config from RON text
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Load a config from a RON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_ron(&text)?;
        tracing::debug!(path = %path.display(), "loaded timeline config");
        Ok(config)
    }
}
