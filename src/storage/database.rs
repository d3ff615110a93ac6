//! `SQLite` database connection.
//!
//! The database is stored at `~/.repsync/repsync.db` and holds the offline
//! write queue. File databases run in WAL mode with a busy timeout so a
//! `repsync watch` process and one-shot commands can share it.

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;

use crate::error::RepsyncError;

use super::migrations;

/// How long a writer waits for a lock held by another process.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the queue database at `path` and bring its schema
    /// up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub fn open_at(path: &Path) -> Result<Self, RepsyncError> {
        let conn = Connection::open(path).map_err(|e| {
            RepsyncError::Database(format!("Failed to open database {}: {e}", path.display()))
        })?;

        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| RepsyncError::Database(format!("Failed to set busy timeout: {e}")))?;

        // journal_mode returns the resulting mode as a row
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get::<_, String>(0))
            .map_err(|e| RepsyncError::Database(format!("Failed to enable WAL: {e}")))?;

        let db = Self { conn };
        db.migrate()?;

        Ok(db)
    }

    /// Open an in-memory database (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub fn open_in_memory() -> Result<Self, RepsyncError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            RepsyncError::Database(format!("Failed to open in-memory database: {e}"))
        })?;

        let db = Self { conn };
        db.migrate()?;

        Ok(db)
    }

    fn migrate(&self) -> Result<(), RepsyncError> {
        migrations::run(&self.conn)
    }

    /// Get the current schema version.
    ///
    /// # Errors
    ///
    /// Returns an error if the version cannot be read.
    pub fn schema_version(&self) -> Result<i32, RepsyncError> {
        migrations::get_version(&self.conn)
    }

    /// Get a reference to the underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}
