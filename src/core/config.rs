use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::process_monitor::{
    FilterMode, SortMode, DEFAULT_HISTORY_SIZE, DEFAULT_PRIVILEGED_OWNERS,
    DEFAULT_RESERVED_PREFIXES,
};
use crate::error::MonitorError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scheduler interval
    pub refresh_interval_ms: u64,
    /// How long a row interaction suspends auto refresh
    pub pause_duration_ms: u64,
    pub history_capacity: usize,
    pub graceful_timeout_ms: u64,
    pub force_timeout_ms: u64,
    /// Name prefixes that never count as foreground apps
    pub reserved_prefixes: Vec<String>,
    /// Owners hidden by the Non-root filter
    pub privileged_owners: Vec<String>,
    /// Above this many denied processes, the status line suggests elevation
    pub access_denied_tip_threshold: usize,
    pub default_filter: FilterMode,
    pub default_sort: SortMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 100,
            pause_duration_ms: 5000,
            history_capacity: DEFAULT_HISTORY_SIZE,
            graceful_timeout_ms: 3000,
            force_timeout_ms: 2000,
            reserved_prefixes: DEFAULT_RESERVED_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            privileged_owners: DEFAULT_PRIVILEGED_OWNERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            access_denied_tip_threshold: 10,
            default_filter: FilterMode::All,
            default_sort: SortMode::Default,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load from an explicit path. A missing, empty or unparsable file yields
    /// the defaults.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let data = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        if data.trim().is_empty() {
            return Ok(Config::default());
        }

        Ok(serde_json::from_str(&data).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable config {:?}: {}", config_path, e);
            Config::default()
        }))
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let data = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(config_path, data)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().with_context(|| "Could not determine config directory")?;

        Ok(config_dir.join("procwatch").join("config.json"))
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if self.refresh_interval_ms == 0 {
            return Err(MonitorError::config("refresh_interval_ms must be greater than 0"));
        }
        if self.history_capacity == 0 {
            return Err(MonitorError::config("history_capacity must be greater than 0"));
        }
        Ok(())
    }
}
