//! Configuration types for the activity engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinionConfig {
    /// Scheduler loop and task store settings.
    pub scheduler: SchedulerConfig,
    /// Random source settings.
    pub rng: RngConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

/// Scheduler loop and task store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Longest the loop sleeps without re-checking the store, in milliseconds.
    pub max_idle_ms: u64,
    /// Deadline for each user-state call made during a resolution, in milliseconds.
    pub io_timeout_ms: u64,
    /// SQLite task database. `None` uses `minion_tasks.db` in the data directory.
    pub database_path: Option<PathBuf>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_idle_ms: 1_000,
            io_timeout_ms: 5_000,
            database_path: None,
        }
    }
}

impl SchedulerConfig {
    /// [`max_idle_ms`](Self::max_idle_ms), at least 1 ms.
    pub fn max_idle(&self) -> Duration {
        Duration::from_millis(self.max_idle_ms.max(1))
    }

    /// [`io_timeout_ms`](Self::io_timeout_ms), at least 1 ms.
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms.max(1))
    }

    /// Where the task database lives: the configured path, else
    /// [`minion_dirs::task_db_file`](crate::minion_dirs::task_db_file).
    pub fn effective_database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| crate::minion_dirs::task_db_file())
    }
}

/// Random source settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RngConfig {
    /// Fixed seed for reproducible runs. Unset draws from OS entropy.
    pub seed: Option<u64>,
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "minion=info".to_owned(),
        }
    }
}

impl MinionConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::ActivityError::Config(e.to_string()))
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load_or_default(path: &std::path::Path) -> crate::error::Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ActivityError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config dir>/minion/config.toml`.
    pub fn default_config_path() -> PathBuf {
        crate::minion_dirs::config_file()
    }
}
