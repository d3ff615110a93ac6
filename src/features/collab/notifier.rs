//! User-visible notifications from the sync machinery.

use colored::Colorize;
use tracing::{info, warn};

/// Receives warnings (one per rejected entry) and run summaries.
pub trait Notifier: Send + Sync {
    /// Something the user should know about, e.g. a discarded action.
    fn warn(&self, message: &str);

    /// One-line outcome of a sync run.
    fn summary(&self, message: &str);
}

/// Writes to stderr in color, and to the log.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleNotifier {
    show_summary: bool,
}

impl ConsoleNotifier {
    /// `show_summary = false` leaves summaries to the caller's own output.
    #[must_use]
    pub const fn new(show_summary: bool) -> Self {
        Self { show_summary }
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Notifier for ConsoleNotifier {
    fn warn(&self, message: &str) {
        warn!("{message}");
        eprintln!("{} {message}", "Warning:".yellow().bold());
    }

    fn summary(&self, message: &str) {
        info!("{message}");
        if self.show_summary {
            eprintln!("{} {message}", "Sync:".cyan());
        }
    }
}

/// Log-only notifier for headless use.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn warn(&self, message: &str) {
        warn!("{message}");
    }

    fn summary(&self, message: &str) {
        info!("{message}");
    }
}
