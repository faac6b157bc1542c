//! Configuration for combinator scheduling and reporting.
//!
//! Configuration is read from a JSON file. Every field has a default, so a
//! missing file or an empty object yields [`CombinatorConfig::default`].
//!
//! # Example deferral.json
//!
//! ```json
//! {
//!   "scheduling": "next-tick",
//!   "output": "json"
//! }
//! ```

use crate::error::{DeferralError, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "deferral.json";

/// How loops choose their scheduling strategy.
///
/// # Example
///
/// ```
/// use deferral::config::SchedulingMode;
///
/// assert_eq!(SchedulingMode::default(), SchedulingMode::Auto);
/// assert_eq!(SchedulingMode::NextTick.to_string(), "next-tick");
/// ```
#[derive(
    Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulingMode {
    /// Tick scheduling if a reactor is running, inline otherwise
    #[default]
    Auto,
    /// Always one attempt per reactor tick
    NextTick,
    /// Always run attempts back to back
    Inline,
}

impl std::fmt::Display for SchedulingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulingMode::Auto => write!(f, "auto"),
            SchedulingMode::NextTick => write!(f, "next-tick"),
            SchedulingMode::Inline => write!(f, "inline"),
        }
    }
}

/// Report format for the command-line runner.
#[derive(
    Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Coloured human-readable summary
    #[default]
    Text,
    /// A single JSON document
    Json,
}

/// Combinator configuration loaded from `deferral.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinatorConfig {
    /// Scheduling strategy for loops.
    #[serde(default)]
    pub scheduling: SchedulingMode,

    /// Report format.
    #[serde(default)]
    pub output: OutputFormat,
}

impl CombinatorConfig {
    /// Load configuration from `path`, falling back to defaults if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: CombinatorConfig = serde_json::from_str(&content).map_err(|e| {
            DeferralError::config_with_path(e.to_string(), path.to_path_buf())
        })?;
        Ok(config)
    }

    /// Load `deferral.json` from a directory.
    ///
    /// # Errors
    ///
    /// Same as [`CombinatorConfig::load`].
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load(&Self::config_path(dir))
    }

    /// Path of the configuration file inside `dir`.
    #[must_use]
    pub fn config_path(dir: &Path) -> PathBuf {
        dir.join(CONFIG_FILE_NAME)
    }

    /// Override the scheduling mode.
    #[must_use]
    pub fn with_scheduling(mut self, scheduling: SchedulingMode) -> Self {
        self.scheduling = scheduling;
        self
    }

    /// Override the report format.
    #[must_use]
    pub fn with_output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }
}
