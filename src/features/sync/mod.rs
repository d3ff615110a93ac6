//! Offline write queue and the engine that drains it.
//!
//! Writes that cannot reach the server are stored in a [`QueueStore`] and
//! replayed later by a [`SyncEngine`], oldest first, each under its own
//! idempotency key.

pub mod engine;
pub mod operation;
pub mod queue;
pub mod report;

pub use engine::{EngineConfig, SyncEngine};
pub use operation::{EntryId, EntryStatus, Operation, QueueEntry, WorkoutLog};
pub use queue::{QueueStore, DEFAULT_MAX_QUEUE_SIZE};
pub use report::{
    format_sync_report, HaltReason, QueueStatus, Rejection, RunOutcome, SyncReport,
};
