use crate::error::{ProcletError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Launch specification for a single process.
///
/// Immutable once a handle has been started from it. The same value serves
/// as the shared template of a repeating [`crate::ProcessGroup`] or as one
/// slot of a parallel set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Path to the executable to run
    pub command: String,

    /// Command-line arguments
    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory for the process
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// Extra environment variables, layered over the inherited environment
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Default condition-wait timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Default condition-poll interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

// Default value functions for serde
fn default_timeout_ms() -> u64 {
    10_000
}

fn default_poll_interval_ms() -> u64 {
    500
}

impl ServiceConfig {
    /// Create a configuration with default timing for the given command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            cwd: None,
            env: HashMap::new(),
            timeout_ms: default_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }

    /// Replace the argument vector.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Get the condition-wait timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get the condition-poll interval as a Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Validate the configuration.
    ///
    /// Deliberately does NOT check that `command` resolves to an existing
    /// executable: a missing binary must surface as terminal status
    /// `Failed` on the handle that tried to start it, not as an early
    /// configuration error.
    pub fn validate(&self) -> Result<()> {
        if self.command.trim().is_empty() {
            return Err(ProcletError::ConfigError(
                "command must not be empty".to_string(),
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(ProcletError::ConfigError(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
