//! Log setup for the binary.

use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "REPSYNC_LOG";

/// Pick the filter directive: `REPSYNC_LOG` wins, then `-v` flags, then the
/// configured level.
#[must_use]
pub fn filter_directive(env_value: Option<&str>, verbose: u8, configured: &str) -> String {
    if let Some(value) = env_value.filter(|v| !v.trim().is_empty()) {
        return value.to_string();
    }
    match verbose {
        0 => configured.to_string(),
        1 => "repsync=debug".to_string(),
        _ => "repsync=trace".to_string(),
    }
}

/// Install the stderr subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(verbose: u8, configured: &str) {
    let env_value = std::env::var(LOG_ENV).ok();
    let directive = filter_directive(env_value.as_deref(), verbose, configured);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose > 0)
        .try_init();
}
