//! Path resolution for repsync configuration and data files.
//!
//! All repsync data is stored in `~/.repsync/` (or `$REPSYNC_HOME`):
//! - `config.yaml` - Main configuration file
//! - `repsync.db` - SQLite database holding the offline write queue
//! - `cache/` - Cached server reads (leaderboard, profile, history)
//! - `sync-requested` - Deferred background-sync marker

use std::path::PathBuf;

use crate::error::RepsyncError;

/// Environment variable overriding the data root.
pub const HOME_ENV: &str = "REPSYNC_HOME";

/// Paths to repsync configuration and data directories.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root directory: `~/.repsync/`
    pub root: PathBuf,
    /// Config file: `~/.repsync/config.yaml`
    pub config_file: PathBuf,
    /// Database file: `~/.repsync/repsync.db`
    pub database: PathBuf,
    /// Cache directory: `~/.repsync/cache/`
    pub cache: PathBuf,
    /// Background-sync marker: `~/.repsync/sync-requested`
    pub sync_marker: PathBuf,
}

impl Paths {
    /// Create paths from `$REPSYNC_HOME`, falling back to `~/.repsync`.
    ///
    /// # Errors
    ///
    /// Returns an error if neither variable is set.
    pub fn new() -> Result<Self, RepsyncError> {
        if let Ok(root) = std::env::var(HOME_ENV) {
            return Ok(Self::with_root(PathBuf::from(root)));
        }

        let home = std::env::var("HOME").map_err(|_| {
            RepsyncError::Config("Could not determine home directory".to_string())
        })?;

        Ok(Self::with_root(PathBuf::from(home).join(".repsync")))
    }

    /// Create paths with a custom root directory (useful for testing).
    #[must_use]
    pub fn with_root(root: PathBuf) -> Self {
        Self {
            config_file: root.join("config.yaml"),
            database: root.join("repsync.db"),
            cache: root.join("cache"),
            sync_marker: root.join("sync-requested"),
            root,
        }
    }

    /// Ensure all directories exist, creating them if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation fails.
    pub fn ensure_dirs(&self) -> Result<(), RepsyncError> {
        for dir in [&self.root, &self.cache] {
            if !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    RepsyncError::Config(format!(
                        "Failed to create directory {}: {e}",
                        dir.display()
                    ))
                })?;
            }
        }

        Ok(())
    }
}
