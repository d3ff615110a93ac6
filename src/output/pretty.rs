use chrono::Utc;
use colored::Colorize;

use crate::features::interceptor::Submission;
use crate::features::sync::{
    format_sync_report, EntryStatus, Operation, QueueEntry, QueueStatus, RunOutcome,
};

/// Confirmation line for `log`.
pub fn format_submission_pretty(submission: &Submission, description: &str) -> String {
    if submission.queued {
        let mut output = format!(
            "{} {} {}",
            "⇡".yellow(),
            description.bold(),
            "saved offline; it will sync when the server is reachable".yellow()
        );
        if let Some(reason) = &submission.reason {
            output.push_str(&format!("\n  {}", reason.dimmed()));
        }
        output
    } else {
        format!("{} {} {}", "✓".green(), description.bold(), "logged".green())
    }
}

/// Queue status block.
pub fn format_status_pretty(status: &QueueStatus) -> String {
    let mut lines = Vec::new();

    lines.push("Offline Queue".bold().to_string());
    lines.push("─".repeat(40));

    if status.pending == 0 {
        lines.push(format!("  {}", "All workouts synced".green()));
    } else {
        lines.push(format!(
            "  Pending:     {} {}",
            status.pending,
            "waiting to sync".dimmed()
        ));
        if status.in_flight > 0 {
            lines.push(format!("  Sending:     {}", status.in_flight));
        }
        if let Some(oldest) = status.oldest_queued_at {
            let age = Utc::now().signed_duration_since(oldest);
            let age_str = if age.num_hours() > 0 {
                format!("{} hours ago", age.num_hours())
            } else if age.num_minutes() > 0 {
                format!("{} minutes ago", age.num_minutes())
            } else {
                "just now".to_string()
            };
            lines.push(format!("  Oldest:      {}", age_str.dimmed()));
        }
    }

    lines.push(format!(
        "  Capacity:    {}/{}",
        status.pending, status.capacity
    ));
    lines.push(format!(
        "  Background:  {}",
        if status.background_sync {
            "enabled".green()
        } else {
            "foreground only".dimmed()
        }
    ));

    if status.pending > 0 {
        lines.push(String::new());
        lines.push(
            "Run 'repsync sync' to deliver them now"
                .dimmed()
                .to_string(),
        );
    }

    lines.join("\n")
}

/// Queued entries, one per line.
pub fn format_entries_pretty(entries: &[QueueEntry], total: usize) -> String {
    if entries.is_empty() {
        return format!("Queued (0 items)\n  {}", "Nothing waiting".dimmed());
    }

    let now = Utc::now();
    let mut output = format!("Queued ({total} items)\n");
    output.push_str(&"─".repeat(60));
    output.push('\n');

    for entry in entries {
        let icon = match entry.status {
            EntryStatus::Pending => "○".yellow(),
            EntryStatus::InFlight => "⇡".cyan(),
        };
        let mut line = format!(
            "{} {}  {}",
            icon,
            entry.operation.describe().bold(),
            entry.age_description(now).dimmed()
        );

        let Operation::LogWorkout(log) = &entry.operation;
        if let Some(note) = &log.note {
            line.push_str(&format!("  {}", format!("\"{note}\"").italic()));
        }

        if entry.attempts > 0 {
            let attempts = format!(
                "{} failed attempt{}",
                entry.attempts,
                if entry.attempts == 1 { "" } else { "s" }
            );
            line.push_str(&format!("  {}", attempts.red()));
        }

        output.push_str(&line);
        output.push('\n');
    }

    if total > entries.len() {
        output.push_str(&format!(
            "{}\n",
            format!("… and {} more", total - entries.len()).dimmed()
        ));
    }

    output
}

/// Result of a sync run.
pub fn format_outcome_pretty(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Completed(report) => format_sync_report(report),
        RunOutcome::AlreadyRunning => "A sync is already running".yellow().to_string(),
    }
}
