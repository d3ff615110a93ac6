//! Database migrations for repsync.
//!
//! Each migration is a function that upgrades the schema by one version.
//! Migrations are run automatically when the database is opened.

use rusqlite::Connection;

use crate::error::RepsyncError;

/// Current schema version.
const CURRENT_VERSION: i32 = 2;

/// Get the current schema version from the database.
///
/// Returns 0 if no version has been set (new database).
pub fn get_version(conn: &Connection) -> Result<i32, RepsyncError> {
    let version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| RepsyncError::Database(format!("Failed to get schema version: {e}")))?;

    Ok(version)
}

/// Set the schema version in the database.
fn set_version(conn: &Connection, version: i32) -> Result<(), RepsyncError> {
    conn.execute_batch(&format!("PRAGMA user_version = {version};"))
        .map_err(|e| RepsyncError::Database(format!("Failed to set schema version: {e}")))
}

/// Run all pending migrations.
pub fn run(conn: &Connection) -> Result<(), RepsyncError> {
    let current = get_version(conn)?;

    if current >= CURRENT_VERSION {
        return Ok(());
    }

    for version in (current + 1)..=CURRENT_VERSION {
        run_migration(conn, version)?;
        set_version(conn, version)?;
    }

    Ok(())
}

/// Run a specific migration.
fn run_migration(conn: &Connection, version: i32) -> Result<(), RepsyncError> {
    match version {
        1 => migrate_v1(conn),
        2 => migrate_v2(conn),
        _ => Err(RepsyncError::Database(format!(
            "Unknown migration version: {version}"
        ))),
    }
}

/// Migration v1: the write queue.
///
/// `seq` only breaks ties between entries queued at the same instant;
/// ordering is `queued_at` first.
fn migrate_v1(conn: &Connection) -> Result<(), RepsyncError> {
    conn.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS write_queue (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            operation TEXT NOT NULL,
            payload TEXT NOT NULL,
            queued_at TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
        );

        CREATE INDEX IF NOT EXISTS idx_write_queue_order
        ON write_queue(queued_at, seq);
        ",
    )
    .map_err(|e| RepsyncError::Database(format!("Migration v1 failed: {e}")))
}

/// Migration v2: retry bookkeeping and in-flight leases.
fn migrate_v2(conn: &Connection) -> Result<(), RepsyncError> {
    conn.execute_batch(
        r"
        ALTER TABLE write_queue ADD COLUMN attempts INTEGER NOT NULL DEFAULT 0;
        ALTER TABLE write_queue ADD COLUMN last_attempt_at TEXT;
        ALTER TABLE write_queue ADD COLUMN last_error TEXT;
        ALTER TABLE write_queue ADD COLUMN in_flight_since TEXT;

        CREATE INDEX IF NOT EXISTS idx_write_queue_status
        ON write_queue(status);
        ",
    )
    .map_err(|e| RepsyncError::Database(format!("Migration v2 failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_create_queue_table() {
        let conn = Connection::open_in_memory().unwrap();

        run(&conn).unwrap();

        assert_eq!(get_version(&conn).unwrap(), CURRENT_VERSION);

        conn.execute(
            "INSERT INTO write_queue (id, operation, payload, queued_at)
             VALUES ('w1', 'log_workout', '{\"type\":\"pushups\",\"amount\":20}', '2024-01-01T10:00:00Z')",
            [],
        )
        .unwrap();

        let (status, attempts): (String, i64) = conn
            .query_row(
                "SELECT status, attempts FROM write_queue WHERE id = 'w1'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(status, "pending");
        assert_eq!(attempts, 0);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();

        let insert = "INSERT INTO write_queue (id, operation, payload, queued_at)
                      VALUES ('dup', 'log_workout', '{}', '2024-01-01T10:00:00Z')";
        conn.execute(insert, []).unwrap();
        assert!(conn.execute(insert, []).is_err());
    }

    #[test]
    fn test_migration_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run(&conn).unwrap();
        run(&conn).unwrap();

        assert_eq!(get_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_upgrade_from_v1() {
        let conn = Connection::open_in_memory().unwrap();
        migrate_v1(&conn).unwrap();
        set_version(&conn, 1).unwrap();

        run(&conn).unwrap();

        assert_eq!(get_version(&conn).unwrap(), 2);
        conn.execute("UPDATE write_queue SET attempts = attempts + 1", [])
            .unwrap();
    }

    #[test]
    fn test_get_version_new_database() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(get_version(&conn).unwrap(), 0);
    }
}
