//! Configuration for learning-progress

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default storage directory
pub fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("learning-progress")
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the SQLite database and config file
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// HTTP API port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Number of assessments returned in a topic mastery detail view
    #[serde(default = "default_recent_assessments_limit")]
    pub recent_assessments_limit: usize,

    /// How many days back the streak walk may go
    #[serde(default = "default_streak_lookback_days")]
    pub streak_lookback_days: u32,

    /// Recommendation count when the caller does not pass a limit
    #[serde(default = "default_recommendation_limit")]
    pub default_recommendation_limit: usize,

    /// Analytics window when the caller does not pass one
    #[serde(default = "default_analytics_window_days")]
    pub default_analytics_window_days: u32,
}

fn default_http_port() -> u16 {
    8095
}

fn default_recent_assessments_limit() -> usize {
    10
}

fn default_streak_lookback_days() -> u32 {
    365
}

fn default_recommendation_limit() -> usize {
    10
}

fn default_analytics_window_days() -> u32 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            http_port: default_http_port(),
            recent_assessments_limit: default_recent_assessments_limit(),
            streak_lookback_days: default_streak_lookback_days(),
            default_recommendation_limit: default_recommendation_limit(),
            default_analytics_window_days: default_analytics_window_days(),
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Get SQLite database path
    pub fn database_path(&self) -> PathBuf {
        self.storage_dir.join("progress.db")
    }

    /// Get config file path
    pub fn config_path(&self) -> PathBuf {
        self.storage_dir.join("config.toml")
    }
}
