//! Invalidation of cached server reads.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RepsyncError;

/// A cached view that may be stale after writes reach the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheScope {
    /// Global rankings.
    Leaderboard,
    /// User profile (XP, level, achievements).
    Profile,
    /// The user's workout history.
    WorkoutHistory,
}

impl CacheScope {
    /// Scopes affected by newly synced workouts.
    pub const AFTER_SYNC: [Self; 3] = [Self::Leaderboard, Self::Profile, Self::WorkoutHistory];

    /// Name used for cache files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Leaderboard => "leaderboard",
            Self::Profile => "profile",
            Self::WorkoutHistory => "workout_history",
        }
    }
}

impl fmt::Display for CacheScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Told which cached views to drop after a sync run delivered something.
#[cfg_attr(test, mockall::automock)]
pub trait CacheInvalidator: Send + Sync {
    /// Mark `scopes` stale.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache could not be cleared.
    fn invalidate(&self, scopes: &[CacheScope]) -> Result<(), RepsyncError>;
}

/// Does nothing; for clients without a read cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInvalidator;

impl CacheInvalidator for NoopInvalidator {
    fn invalidate(&self, _scopes: &[CacheScope]) -> Result<(), RepsyncError> {
        Ok(())
    }
}

/// Deletes `<dir>/<scope>.json` for each stale scope.
#[derive(Debug, Clone)]
pub struct FileCacheInvalidator {
    dir: PathBuf,
}

impl FileCacheInvalidator {
    /// Invalidate files under `dir`.
    #[must_use]
    pub const fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn file_for(&self, scope: CacheScope) -> PathBuf {
        self.dir.join(format!("{}.json", scope.as_str()))
    }
}

impl CacheInvalidator for FileCacheInvalidator {
    fn invalidate(&self, scopes: &[CacheScope]) -> Result<(), RepsyncError> {
        for scope in scopes {
            let file = self.file_for(*scope);
            match std::fs::remove_file(&file) {
                Ok(()) => debug!(scope = %scope, "cache entry removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
