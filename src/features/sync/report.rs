//! Outcome of a sync run.

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;

use super::operation::EntryId;
use crate::features::trigger::Trigger;

/// Why a run stopped before draining the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum HaltReason {
    /// The head entry is still inside its backoff window.
    Backoff {
        /// When the head entry becomes eligible.
        retry_at: DateTime<Utc>,
    },
    /// A send failed in a way worth retrying later.
    Transient {
        /// Entry that failed.
        id: EntryId,
        /// Failure description.
        error: String,
    },
    /// No usable credential, or the server refused it.
    Credentials {
        /// Failure description.
        error: String,
    },
    /// Another sender holds the next entry.
    Contended {
        /// Entry that could not be claimed.
        id: EntryId,
    },
}

impl HaltReason {
    /// Short explanation for the summary line.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Backoff { retry_at } => {
                format!("next retry after {}", retry_at.format("%H:%M:%S"))
            },
            Self::Transient { .. } | Self::Credentials { .. } => {
                "will retry when back online".to_string()
            },
            Self::Contended { .. } => "another sync is in progress".to_string(),
        }
    }
}

/// An entry discarded because the server refused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// Discarded entry.
    pub id: EntryId,
    /// Human description of the action.
    pub operation: String,
    /// HTTP status.
    pub status: u16,
    /// Server-provided reason.
    pub reason: String,
}

/// End-of-run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// What started the run.
    pub trigger: Trigger,
    /// Entries confirmed by the server.
    pub synced: usize,
    /// Entries discarded after a permanent rejection.
    pub rejected: Vec<Rejection>,
    /// Entries left in the queue when the run ended.
    pub remaining: usize,
    /// Set when the run stopped early.
    pub halt: Option<HaltReason>,
}

impl SyncReport {
    /// Empty report for a run started by `trigger`.
    #[must_use]
    pub const fn new(trigger: Trigger) -> Self {
        Self {
            trigger,
            synced: 0,
            rejected: Vec::new(),
            remaining: 0,
            halt: None,
        }
    }

    /// Whether the run made any change to the queue.
    #[must_use]
    pub fn made_progress(&self) -> bool {
        self.synced > 0 || !self.rejected.is_empty()
    }

    /// "3 synced, 1 still pending" style summary.
    #[must_use]
    pub fn summary_line(&self) -> String {
        if !self.made_progress() && self.remaining == 0 && self.halt.is_none() {
            return "Nothing to sync".to_string();
        }

        let mut line = format!("{} synced", self.synced);
        if !self.rejected.is_empty() {
            line.push_str(&format!(", {} rejected", self.rejected.len()));
        }
        if self.remaining > 0 {
            line.push_str(&format!(", {} still pending", self.remaining));
        }
        if let Some(halt) = &self.halt {
            line.push_str(&format!(" ({})", halt.describe()));
        }
        line
    }
}

/// Result of asking the engine to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The run happened.
    Completed(SyncReport),
    /// A run was already in progress; nothing was done.
    AlreadyRunning,
}

impl RunOutcome {
    /// The report, if the run happened.
    #[must_use]
    pub const fn report(&self) -> Option<&SyncReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::AlreadyRunning => None,
        }
    }
}

/// Snapshot of the queue for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    /// Entries waiting, including those being sent.
    pub pending: usize,
    /// Entries currently claimed by a sender.
    pub in_flight: usize,
    /// Queue time of the oldest entry.
    pub oldest_queued_at: Option<DateTime<Utc>>,
    /// Configured capacity.
    pub capacity: usize,
    /// Whether deferred background wake-ups are available.
    pub background_sync: bool,
}

/// Format a sync report for display.
#[must_use]
pub fn format_sync_report(report: &SyncReport) -> String {
    let mut lines = Vec::new();

    lines.push(format!("Sync ({})", report.trigger));
    lines.push("─".repeat(40));

    if report.synced > 0 {
        lines.push(format!(
            "  {} {}",
            "✓".green(),
            format!("{} synced", report.synced).green()
        ));
    }

    for rejection in &report.rejected {
        lines.push(format!(
            "  {} {} {}",
            "✗".red(),
            rejection.operation.red(),
            format!("rejected ({}): {}", rejection.status, rejection.reason).dimmed()
        ));
    }

    if report.remaining > 0 {
        lines.push(format!(
            "  {} {}",
            "○".yellow(),
            format!("{} still pending", report.remaining).yellow()
        ));
    }

    if let Some(halt) = &report.halt {
        let detail = match halt {
            HaltReason::Transient { error, .. } | HaltReason::Credentials { error } => {
                format!("{}: {error}", halt.describe())
            },
            HaltReason::Backoff { .. } | HaltReason::Contended { .. } => halt.describe(),
        };
        lines.push(format!("  {} {}", "…".yellow(), detail.dimmed()));
    }

    if !report.made_progress() && report.remaining == 0 {
        lines.push(format!("  {}", "Nothing to sync".dimmed()));
    }

    lines.join("\n")
}
