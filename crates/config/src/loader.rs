//! Configuration loader for statusd
//!
//! Resolves the final `StatusConfig` at startup: defaults, then an optional
//! JSON file, then `STATUSD_*` environment overrides, then validation.

use crate::config::StatusConfig;
use statusd_core::{
    constants::{
        ENV_FIRST_RUN_TIMEOUT_MS, ENV_INTERVAL_MS, ENV_SHUTDOWN_GRACE_MS, ENV_STALE_THRESHOLD_MS,
    },
    Error, Result,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Configuration loader that handles all startup configuration
pub struct ConfigLoader {
    /// Optional JSON file to read
    file: Option<PathBuf>,
    /// Whether to apply environment overrides
    env_overrides: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            file: None,
            env_overrides: true,
        }
    }

    /// Read settings from a JSON file
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Set whether `STATUSD_*` variables are consulted
    pub fn env_overrides(mut self, enabled: bool) -> Self {
        self.env_overrides = enabled;
        self
    }

    /// Load and validate the configuration
    pub fn load(self) -> Result<StatusConfig> {
        let mut config = match &self.file {
            Some(path) => Self::read_file(path)?,
            None => StatusConfig::default(),
        };

        if self.env_overrides {
            apply_overrides(&mut config, |key| std::env::var(key).ok())?;
        }

        config.validate()?;
        debug!(
            interval = ?config.collector.interval,
            stale_threshold = ?config.collector.stale_threshold,
            "status configuration loaded"
        );
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<StatusConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::file_system(path, "read", e))?;
        parse_json(&content)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a JSON document; missing fields take their defaults
pub fn parse_json(content: &str) -> Result<StatusConfig> {
    Ok(serde_json::from_str(content)?)
}

/// Apply environment overrides using `lookup` to resolve variables
pub fn apply_overrides<F>(config: &mut StatusConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let read = |key: &str| -> Result<Option<Duration>> {
        match lookup(key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(|ms| Some(Duration::from_millis(ms)))
                .map_err(|e| {
                    Error::configuration(format!("{key} must be milliseconds, got '{raw}': {e}"))
                }),
        }
    };

    if let Some(d) = read(ENV_INTERVAL_MS)? {
        config.collector.interval = d;
    }
    if let Some(d) = read(ENV_STALE_THRESHOLD_MS)? {
        config.collector.stale_threshold = d;
    }
    if let Some(d) = read(ENV_SHUTDOWN_GRACE_MS)? {
        config.collector.shutdown_grace = d;
    }
    if let Some(d) = read(ENV_FIRST_RUN_TIMEOUT_MS)? {
        config.first_run_timeout = d;
    }
    Ok(())
}
