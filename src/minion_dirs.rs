//! Filesystem locations for the activity engine.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! # Environment Overrides
//!
//! - `MINION_DATA_DIR` overrides [`data_dir`]
//! - `MINION_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Data root: the task database lives here.
///
/// Resolves to `dirs::data_dir()/minion/` by default.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("MINION_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("minion"))
        .unwrap_or_else(|| PathBuf::from("/tmp/minion-data"))
}

/// Config directory, holding `config.toml`.
///
/// Resolves to `dirs::config_dir()/minion/` by default.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("MINION_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("minion"))
        .unwrap_or_else(|| PathBuf::from("/tmp/minion-config"))
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Task database path (`data_dir()/minion_tasks.db`).
#[must_use]
pub fn task_db_file() -> PathBuf {
    data_dir().join(crate::scheduler::sqlite::DB_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_live_under_their_directories() {
        assert!(config_file().starts_with(config_dir()));
        assert!(config_file().ends_with("config.toml"));
        assert!(task_db_file().starts_with(data_dir()));
        assert!(task_db_file().ends_with("minion_tasks.db"));
    }
}
