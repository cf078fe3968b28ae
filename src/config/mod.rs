//! Highlighter configuration for `chromapipe.toml`.
//!
//! # Example
//!
//! ```toml
//! [coprocess]
//! command = ["./highlight"]   # Executable path followed by its arguments
//! timeout_ms = 5500           # Restart when no output arrives for this long
//! window = 4096               # Max bytes sent but not yet colored
//! retry_interval_ms = 3       # Poll interval while waiting for output
//! ```

mod error;

pub use error::ConfigError;

use crate::watcher::CoprocessCommand;
use serde::Deserialize;
use std::{fs, path::Path, time::Duration};

/// Default response timeout before the coprocess is replaced.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_500;
/// Default in-flight byte window.
pub const DEFAULT_WINDOW: usize = 4096;
/// Default poll interval while waiting for output.
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 3;
/// Largest accepted window. Keeps unread input below common OS pipe
/// buffer sizes, so a hung coprocess cannot block the watcher in `write`.
pub const MAX_WINDOW: usize = 16 * 1024;

// ============================================================================
// Config file
// ============================================================================

/// Root structure of `chromapipe.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub coprocess: HighlighterConfig,
}

/// Settings supplied when a highlighter is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HighlighterConfig {
    /// Coprocess executable followed by its arguments.
    pub command: Vec<String>,

    /// Milliseconds without any output before the coprocess is restarted.
    pub timeout_ms: u64,

    /// Maximum bytes written but not yet acknowledged.
    pub window: usize,

    /// Milliseconds between output polls.
    pub retry_interval_ms: u64,
}

impl Default for HighlighterConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            window: DEFAULT_WINDOW,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
        }
    }
}

impl HighlighterConfig {
    /// Config for the given command line with default tuning.
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::default().with_command(command)
    }

    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn coprocess_command(&self) -> CoprocessCommand {
        CoprocessCommand::from_slice(&self.command)
    }

    /// Parse the `[coprocess]` section of a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        Ok(file.coprocess)
    }

    /// Read a config file. Validation is left to the caller, who may still
    /// apply overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.command.first() {
            None => {
                return Err(ConfigError::validation(
                    "coprocess.command",
                    "no coprocess command configured",
                ));
            }
            Some(program) if program.trim().is_empty() => {
                return Err(ConfigError::validation(
                    "coprocess.command",
                    "program path is empty",
                ));
            }
            Some(_) => {}
        }

        if self.timeout_ms == 0 {
            return Err(ConfigError::validation(
                "coprocess.timeout_ms",
                "must be greater than 0",
            ));
        }

        if self.window == 0 || self.window > MAX_WINDOW {
            return Err(ConfigError::validation(
                "coprocess.window",
                format!("must be between 1 and {MAX_WINDOW}, got {}", self.window),
            ));
        }

        if self.retry_interval_ms == 0 {
            return Err(ConfigError::validation(
                "coprocess.retry_interval_ms",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
