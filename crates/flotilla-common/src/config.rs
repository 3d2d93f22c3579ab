//! Global configuration model for Flotilla.
//!
//! Values are layered: built-in defaults, then an optional JSON file, then
//! environment overrides. Command-line flags are applied last by the CLI.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{FlotillaError, Result};

/// Root configuration for Flotilla.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlotillaConfig {
    /// Path to the local runtime's state index.
    pub state_file: PathBuf,
    /// Grace period, in seconds, handed to the runtime's stop call.
    pub stop_timeout_secs: u64,
    /// Cancel not-yet-started work after the first failure of a bulk operation.
    pub fail_fast: bool,
    /// Answer assumed when the confirmation prompt receives an empty line.
    pub confirm_default: bool,
}

impl Default for FlotillaConfig {
    fn default() -> Self {
        Self {
            state_file: constants::default_state_file(),
            stop_timeout_secs: constants::DEFAULT_STOP_TIMEOUT_SECS,
            fail_fast: true,
            confirm_default: false,
        }
    }
}

impl FlotillaConfig {
    /// Loads configuration from a JSON file. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| FlotillaError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Applies `FLOTILLA_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an override holds an unparsable value.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides resolved through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if an override holds an unparsable value.
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(path) = lookup(constants::ENV_STATE_FILE) {
            self.state_file = PathBuf::from(path);
        }
        if let Some(raw) = lookup(constants::ENV_STOP_TIMEOUT) {
            self.stop_timeout_secs = raw.trim().parse().map_err(|_| FlotillaError::Config {
                message: format!("{} must be a number of seconds, got {raw:?}", constants::ENV_STOP_TIMEOUT),
            })?;
        }
        Ok(self)
    }

    /// Returns the stop grace period as a [`Duration`].
    #[must_use]
    pub const fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}
