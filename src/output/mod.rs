//! Output formatting for repsync.
//!
//! Every command result can be rendered as colored text or as JSON.

mod json;
mod pretty;

use crate::cli::args::OutputFormat;
use crate::error::RepsyncError;
use crate::features::interceptor::Submission;
use crate::features::sync::{QueueEntry, QueueStatus, RunOutcome};

pub use json::*;
pub use pretty::*;

/// Format the result of `log`.
///
/// # Errors
///
/// Returns `RepsyncError::Parse` if JSON serialization fails.
pub fn format_submission(
    submission: &Submission,
    description: &str,
    format: OutputFormat,
) -> Result<String, RepsyncError> {
    match format {
        OutputFormat::Pretty => Ok(format_submission_pretty(submission, description)),
        OutputFormat::Json => to_json(submission),
    }
}

/// Format the queue status.
///
/// # Errors
///
/// Returns `RepsyncError::Parse` if JSON serialization fails.
pub fn format_status(status: &QueueStatus, format: OutputFormat) -> Result<String, RepsyncError> {
    match format {
        OutputFormat::Pretty => Ok(format_status_pretty(status)),
        OutputFormat::Json => to_json(status),
    }
}

/// Format queued entries; `total` is the full queue length.
///
/// # Errors
///
/// Returns `RepsyncError::Parse` if JSON serialization fails.
pub fn format_entries(
    entries: &[QueueEntry],
    total: usize,
    format: OutputFormat,
) -> Result<String, RepsyncError> {
    match format {
        OutputFormat::Pretty => Ok(format_entries_pretty(entries, total)),
        OutputFormat::Json => format_entries_json(entries, total),
    }
}

/// Format the outcome of a sync run.
///
/// # Errors
///
/// Returns `RepsyncError::Parse` if JSON serialization fails.
pub fn format_outcome(outcome: &RunOutcome, format: OutputFormat) -> Result<String, RepsyncError> {
    match format {
        OutputFormat::Pretty => Ok(format_outcome_pretty(outcome)),
        OutputFormat::Json => to_json(outcome),
    }
}
