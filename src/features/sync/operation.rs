//! Operation and queue-entry types for the offline write queue.
//!
//! An [`Operation`] is the domain write the user asked for. A [`QueueEntry`]
//! wraps it with the identity and bookkeeping needed to deliver it later.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Client-generated identifier of a queued write.
///
/// Doubles as the idempotency key sent to the server, so it is never
/// regenerated for the same logical operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Generate a fresh random id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The id as sent in the `Idempotency-Key` header.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameters of a single workout log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutLog {
    /// Exercise kind, e.g. `pushups`.
    #[serde(rename = "type")]
    pub exercise: String,
    /// Repetitions, seconds or meters depending on the exercise.
    pub amount: u32,
    /// Number of sets, if the exercise was split.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sets: Option<u32>,
    /// Free-form note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl WorkoutLog {
    /// Create a log without sets or note.
    #[must_use]
    pub fn new(exercise: impl Into<String>, amount: u32) -> Self {
        Self {
            exercise: exercise.into(),
            amount,
            sets: None,
            note: None,
        }
    }

    /// Set the number of sets.
    #[must_use]
    pub const fn with_sets(mut self, sets: u32) -> Self {
        self.sets = Some(sets);
        self
    }
}

/// A write operation that can be queued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Record a workout through the idempotent "create workout" endpoint.
    LogWorkout(WorkoutLog),
}

impl Operation {
    /// Shorthand for a workout log operation.
    #[must_use]
    pub fn log_workout(exercise: impl Into<String>, amount: u32) -> Self {
        Self::LogWorkout(WorkoutLog::new(exercise, amount))
    }

    /// Stable name stored alongside the payload.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::LogWorkout(_) => "log_workout",
        }
    }

    /// Human-readable description used in warnings and listings.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::LogWorkout(log) => match log.sets {
                Some(sets) => format!("{} {} ({sets} sets)", log.amount, log.exercise),
                None => format!("{} {}", log.amount, log.exercise),
            },
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// Delivery status of a queued entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Eligible for the next sync run.
    Pending,
    /// Claimed by a sync run and currently being sent.
    InFlight,
}

impl EntryStatus {
    /// Value stored in the `status` column.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InFlight => "in_flight",
        }
    }

    /// Parse a stored status; unknown values read as pending.
    #[must_use]
    pub fn from_db(s: &str) -> Self {
        match s {
            "in_flight" => Self::InFlight,
            _ => Self::Pending,
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pending write awaiting confirmation by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Idempotency key.
    pub id: EntryId,
    /// The write to deliver.
    pub operation: Operation,
    /// When the write was queued; defines delivery order.
    pub queued_at: DateTime<Utc>,
    /// Current delivery status.
    pub status: EntryStatus,
    /// Transient failures recorded so far.
    pub attempts: u32,
    /// Time of the last failed attempt.
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// Error from the last failed attempt.
    pub last_error: Option<String>,
}

impl QueueEntry {
    /// Build a fresh pending entry.
    #[must_use]
    pub fn new(id: EntryId, operation: Operation, queued_at: DateTime<Utc>) -> Self {
        Self {
            id,
            operation,
            queued_at,
            status: EntryStatus::Pending,
            attempts: 0,
            last_attempt_at: None,
            last_error: None,
        }
    }

    /// When the entry becomes eligible again after its last transient failure.
    ///
    /// Starts at `base` and doubles per attempt up to `max`. `None` if the
    /// entry has never failed.
    #[must_use]
    pub fn retry_at(&self, base: Duration, max: Duration) -> Option<DateTime<Utc>> {
        let last = self.last_attempt_at?;
        if self.attempts == 0 {
            return None;
        }

        // 2^20 windows are far past any sane ceiling already
        let factor = 1_i32 << (self.attempts - 1).min(20);
        let delay = base.checked_mul(factor).map_or(max, |d| d.min(max));
        Some(last + delay)
    }

    /// "queued 3 minutes ago" style age.
    #[must_use]
    pub fn age_description(&self, now: DateTime<Utc>) -> String {
        let age = now.signed_duration_since(self.queued_at);
        if age.num_days() > 0 {
            format!("queued {} days ago", age.num_days())
        } else if age.num_hours() > 0 {
            format!("queued {} hours ago", age.num_hours())
        } else if age.num_minutes() > 0 {
            format!("queued {} minutes ago", age.num_minutes())
        } else {
            "queued just now".to_string()
        }
    }
}
