//! Deferred background-sync capability.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::config::{Paths, SyncConfig};
use crate::error::RepsyncError;

/// Ability to schedule a sync for later, when the client may no longer be
/// in the foreground.
pub trait BackgroundSync: Send + Sync {
    /// Whether wake-ups are actually delivered on this platform.
    fn is_supported(&self) -> bool;

    /// Ask for a sync wake-up. Repeated registrations collapse into one.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be recorded.
    fn register(&self) -> Result<(), RepsyncError>;

    /// Consume a pending wake-up, returning whether there was one.
    ///
    /// # Errors
    ///
    /// Returns an error if the pending state could not be read or cleared.
    fn take_pending(&self) -> Result<bool, RepsyncError>;
}

/// Wake-ups recorded as a marker file that `repsync watch` consumes.
#[derive(Debug, Clone)]
pub struct MarkerBackgroundSync {
    marker: PathBuf,
}

impl MarkerBackgroundSync {
    /// Use `marker` as the wake-up file.
    #[must_use]
    pub const fn new(marker: PathBuf) -> Self {
        Self { marker }
    }
}

impl BackgroundSync for MarkerBackgroundSync {
    fn is_supported(&self) -> bool {
        true
    }

    fn register(&self) -> Result<(), RepsyncError> {
        if let Some(parent) = self.marker.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.marker, Utc::now().to_rfc3339())?;
        debug!(marker = %self.marker.display(), "background sync registered");
        Ok(())
    }

    fn take_pending(&self) -> Result<bool, RepsyncError> {
        match std::fs::remove_file(&self.marker) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// No background execution; queued work waits for the next foreground
/// trigger.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForegroundOnly;

impl BackgroundSync for ForegroundOnly {
    fn is_supported(&self) -> bool {
        false
    }

    fn register(&self) -> Result<(), RepsyncError> {
        Ok(())
    }

    fn take_pending(&self) -> Result<bool, RepsyncError> {
        Ok(false)
    }
}

/// Select the capability from configuration.
#[must_use]
pub fn background_from_config(sync: &SyncConfig, paths: &Paths) -> Arc<dyn BackgroundSync> {
    if sync.background {
        Arc::new(MarkerBackgroundSync::new(paths.sync_marker.clone()))
    } else {
        Arc::new(ForegroundOnly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_marker_register_and_take() {
        let temp = TempDir::new().unwrap();
        let background = MarkerBackgroundSync::new(temp.path().join("sync-requested"));

        assert!(!background.take_pending().unwrap());
        background.register().unwrap();
        background.register().unwrap();
        assert!(background.take_pending().unwrap());
        assert!(!background.take_pending().unwrap());
    }

    #[test]
    fn test_foreground_only_is_inert() {
        let background = ForegroundOnly;
        assert!(!background.is_supported());
        assert!(background.register().is_ok());
        assert!(!background.take_pending().unwrap());
    }

    #[test]
    fn test_selection_follows_config() {
        let temp = TempDir::new().unwrap();
        let paths = Paths::with_root(temp.path().to_path_buf());

        let mut sync = SyncConfig::default();
        assert!(background_from_config(&sync, &paths).is_supported());

        sync.background = false;
        assert!(!background_from_config(&sync, &paths).is_supported());
    }
}
