//! Durable offline write queue.
//!
//! Entries live in the `write_queue` table until the server confirms or
//! definitively rejects them. Every operation here touches one entry (or
//! only reads) and runs under the store's connection lock, so each is atomic
//! with respect to that entry. Subscribers are told the new pending count
//! after every change made through this store.

use std::sync::Arc;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use tokio::sync::{watch, Mutex};
use tracing::debug;

use super::operation::{EntryId, EntryStatus, Operation, QueueEntry};
use crate::error::RepsyncError;
use crate::storage::Database;

/// Default cap on the number of queued entries.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 1000;

const SELECT_ENTRY: &str = r"SELECT id, payload, queued_at, status, attempts,
                                    last_attempt_at, last_error
                             FROM write_queue";

/// Persistent FIFO of writes awaiting server confirmation.
///
/// Cheap to clone; clones share the connection and the subscriber list.
#[derive(Clone)]
pub struct QueueStore {
    inner: Arc<Inner>,
}

struct Inner {
    db: Mutex<Database>,
    count_tx: watch::Sender<usize>,
    max_size: usize,
}

impl QueueStore {
    /// Create a queue over an existing database connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial count cannot be read.
    pub fn with_database(db: Database, max_size: usize) -> Result<Self, RepsyncError> {
        let count = count_rows(&db)?;
        let (count_tx, _) = watch::channel(count);

        Ok(Self {
            inner: Arc::new(Inner {
                db: Mutex::new(db),
                count_tx,
                max_size,
            }),
        })
    }

    /// In-memory queue for tests and ephemeral use.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn in_memory() -> Result<Self, RepsyncError> {
        Self::with_database(Database::open_in_memory()?, DEFAULT_MAX_QUEUE_SIZE)
    }

    /// Configured capacity.
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.inner.max_size
    }

    /// Queue an operation under a freshly generated id.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue is full or the entry cannot be saved.
    pub async fn enqueue(&self, operation: Operation) -> Result<QueueEntry, RepsyncError> {
        self.enqueue_with_id(EntryId::generate(), operation).await
    }

    /// Queue an operation under a caller-chosen id.
    ///
    /// `queued_at` never precedes the newest existing entry, so a clock step
    /// backwards cannot reorder the queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue is full, the id already exists, or the
    /// entry cannot be saved.
    pub async fn enqueue_with_id(
        &self,
        id: EntryId,
        operation: Operation,
    ) -> Result<QueueEntry, RepsyncError> {
        let payload = serde_json::to_string(&operation)?;
        let db = self.inner.db.lock().await;
        let conn = db.connection();

        let count = count_rows(&db)?;
        if count >= self.inner.max_size {
            return Err(RepsyncError::QueueFull {
                limit: self.inner.max_size,
            });
        }

        let newest: Option<String> = conn
            .query_row("SELECT MAX(queued_at) FROM write_queue", [], |row| row.get(0))
            .map_err(|e| RepsyncError::Database(format!("Failed to read newest entry: {e}")))?;
        let now = Utc::now();
        let queued_at = match newest.as_deref().map(parse_time) {
            Some(Ok(newest)) if newest > now => newest,
            _ => now,
        };

        let entry = QueueEntry::new(id, operation, queued_at);
        conn.execute(
            r"INSERT INTO write_queue (id, operation, payload, queued_at, status)
              VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.id.as_str(),
                entry.operation.kind(),
                payload,
                format_time(entry.queued_at),
                EntryStatus::Pending.as_str(),
            ],
        )
        .map_err(|e| RepsyncError::Database(format!("Failed to enqueue operation: {e}")))?;

        debug!(id = %entry.id, operation = %entry.operation, "queued write");
        self.inner.count_tx.send_replace(count + 1);
        Ok(entry)
    }

    /// All entries, oldest first.
    ///
    /// Entries currently in flight are included so callers can see them.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_pending(&self) -> Result<Vec<QueueEntry>, RepsyncError> {
        let db = self.inner.db.lock().await;
        let mut stmt = db
            .connection()
            .prepare(&format!("{SELECT_ENTRY} ORDER BY queued_at ASC, seq ASC"))
            .map_err(|e| RepsyncError::Database(format!("Failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([], row_to_entry)
            .map_err(|e| RepsyncError::Database(format!("Failed to query queue: {e}")))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(|e| RepsyncError::Database(e.to_string()))?);
        }

        Ok(entries)
    }

    /// Number of queued entries. Does not load payloads.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count(&self) -> Result<usize, RepsyncError> {
        let db = self.inner.db.lock().await;
        count_rows(&db)
    }

    /// Number of entries currently claimed by a sender.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn in_flight_count(&self) -> Result<usize, RepsyncError> {
        let db = self.inner.db.lock().await;
        let count: i64 = db
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM write_queue WHERE status = 'in_flight'",
                [],
                |row| row.get(0),
            )
            .map_err(|e| RepsyncError::Database(format!("Failed to count in-flight entries: {e}")))?;

        usize::try_from(count).map_err(|e| RepsyncError::Database(e.to_string()))
    }

    /// Get a specific entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get(&self, id: &EntryId) -> Result<Option<QueueEntry>, RepsyncError> {
        let db = self.inner.db.lock().await;
        db.connection()
            .query_row(&format!("{SELECT_ENTRY} WHERE id = ?1"), [id.as_str()], row_to_entry)
            .optional()
            .map_err(|e| RepsyncError::Database(format!("Failed to query entry: {e}")))
    }

    /// Claim a pending entry for delivery.
    ///
    /// Returns `false` if the entry is already in flight or no longer exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn mark_in_flight(&self, id: &EntryId) -> Result<bool, RepsyncError> {
        let db = self.inner.db.lock().await;
        let rows = db
            .connection()
            .execute(
                r"UPDATE write_queue SET status = 'in_flight', in_flight_since = ?1
                  WHERE id = ?2 AND status = 'pending'",
                params![format_time(Utc::now()), id.as_str()],
            )
            .map_err(|e| RepsyncError::Database(format!("Failed to mark entry in flight: {e}")))?;

        Ok(rows > 0)
    }

    /// Return an in-flight entry to pending after a transient failure.
    ///
    /// Counts the attempt and records the error for backoff and display.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn mark_pending(&self, id: &EntryId, error: &str) -> Result<bool, RepsyncError> {
        let db = self.inner.db.lock().await;
        let rows = db
            .connection()
            .execute(
                r"UPDATE write_queue SET
                  status = 'pending',
                  in_flight_since = NULL,
                  attempts = attempts + 1,
                  last_attempt_at = ?1,
                  last_error = ?2
                  WHERE id = ?3",
                params![format_time(Utc::now()), error, id.as_str()],
            )
            .map_err(|e| RepsyncError::Database(format!("Failed to mark entry pending: {e}")))?;

        Ok(rows > 0)
    }

    /// Return an in-flight entry to pending without counting an attempt.
    ///
    /// Used when the entry was never actually sent.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn revert_in_flight(&self, id: &EntryId) -> Result<bool, RepsyncError> {
        let db = self.inner.db.lock().await;
        let rows = db
            .connection()
            .execute(
                r"UPDATE write_queue SET status = 'pending', in_flight_since = NULL
                  WHERE id = ?1 AND status = 'in_flight'",
                [id.as_str()],
            )
            .map_err(|e| RepsyncError::Database(format!("Failed to revert entry: {e}")))?;

        Ok(rows > 0)
    }

    /// Delete an entry after confirmed success or permanent rejection.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn remove(&self, id: &EntryId) -> Result<bool, RepsyncError> {
        let db = self.inner.db.lock().await;
        let rows = db
            .connection()
            .execute("DELETE FROM write_queue WHERE id = ?1", [id.as_str()])
            .map_err(|e| RepsyncError::Database(format!("Failed to remove entry: {e}")))?;

        if rows > 0 {
            self.inner.count_tx.send_replace(count_rows(&db)?);
        }
        Ok(rows > 0)
    }

    /// Revert entries left in flight longer than `older_than`.
    ///
    /// Such entries belong to a sender that died mid-request. Replaying them
    /// is safe because the server dedupes by idempotency key.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn reclaim_stale(&self, older_than: Duration) -> Result<usize, RepsyncError> {
        let cutoff = Utc::now() - older_than;
        let db = self.inner.db.lock().await;
        let rows = db
            .connection()
            .execute(
                r"UPDATE write_queue SET status = 'pending', in_flight_since = NULL
                  WHERE status = 'in_flight'
                    AND (in_flight_since IS NULL OR in_flight_since <= ?1)",
                [format_time(cutoff)],
            )
            .map_err(|e| RepsyncError::Database(format!("Failed to reclaim entries: {e}")))?;

        Ok(rows)
    }

    /// Queue time of the oldest entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn oldest_queued_at(&self) -> Result<Option<DateTime<Utc>>, RepsyncError> {
        let db = self.inner.db.lock().await;
        let oldest: Option<String> = db
            .connection()
            .query_row("SELECT MIN(queued_at) FROM write_queue", [], |row| row.get(0))
            .map_err(|e| RepsyncError::Database(format!("Failed to get oldest entry: {e}")))?;

        oldest
            .as_deref()
            .map(parse_time)
            .transpose()
            .map_err(|e| RepsyncError::Database(format!("Corrupt queue timestamp: {e}")))
    }

    /// Observe the pending count.
    ///
    /// The receiver holds the current value immediately and changes whenever
    /// an entry is added or removed through this store.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.inner.count_tx.subscribe()
    }

    /// Re-read the count and publish it if it changed.
    ///
    /// Picks up entries written by other processes sharing the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn refresh(&self) -> Result<usize, RepsyncError> {
        let db = self.inner.db.lock().await;
        let count = count_rows(&db)?;
        self.inner.count_tx.send_if_modified(|current| {
            let changed = *current != count;
            *current = count;
            changed
        });
        Ok(count)
    }

    #[cfg(test)]
    pub(crate) async fn database_for_tests(&self) -> tokio::sync::MutexGuard<'_, Database> {
        self.inner.db.lock().await
    }
}

fn count_rows(db: &Database) -> Result<usize, RepsyncError> {
    let count: i64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM write_queue", [], |row| row.get(0))
        .map_err(|e| RepsyncError::Database(format!("Failed to count entries: {e}")))?;

    usize::try_from(count).map_err(|e| RepsyncError::Database(e.to_string()))
}

/// Fixed-width UTC timestamps, so text order equals time order.
fn format_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|t| t.with_timezone(&Utc))
}

fn row_to_entry(row: &Row<'_>) -> Result<QueueEntry, rusqlite::Error> {
    let id: String = row.get(0)?;
    let payload: String = row.get(1)?;
    let queued_at: String = row.get(2)?;
    let status: String = row.get(3)?;
    let attempts: u32 = row.get(4)?;
    let last_attempt_at: Option<String> = row.get(5)?;
    let last_error: Option<String> = row.get(6)?;

    let operation: Operation = serde_json::from_str(&payload)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
    let queued_at = parse_time(&queued_at)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
    let last_attempt_at = last_attempt_at.and_then(|s| parse_time(&s).ok());

    Ok(QueueEntry {
        id: EntryId::from(id),
        operation,
        queued_at,
        status: EntryStatus::from_db(&status),
        attempts,
        last_attempt_at,
        last_error,
    })
}
