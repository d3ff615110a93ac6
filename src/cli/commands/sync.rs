//! The `sync` and `watch` commands.

use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use tokio::sync::watch as signal;

use crate::cli::args::{OutputFormat, WatchArgs};
use crate::error::RepsyncError;
use crate::features::collab::ConsoleNotifier;
use crate::features::trigger::{ConnectivityMonitor, HttpHealthProbe, Trigger, TriggerLoop};
use crate::output::format_outcome;

use super::Context;

/// Timeout for a single health probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Run one manual sync pass.
///
/// # Errors
///
/// Returns an error if the queue database fails.
pub async fn sync(ctx: &Context, format: OutputFormat) -> Result<String, RepsyncError> {
    let store = ctx.open_store()?;
    let engine = ctx.engine(store, Arc::new(ConsoleNotifier::new(false)))?;

    let outcome = engine.run(Trigger::Manual).await?;
    format_outcome(&outcome, format)
}

/// Host the trigger loop until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the queue or the HTTP clients cannot be set up.
pub async fn watch(ctx: &Context, args: WatchArgs) -> Result<String, RepsyncError> {
    let store = ctx.open_store()?;
    let engine = Arc::new(ctx.engine(store, Arc::new(ConsoleNotifier::new(true)))?);
    let probe = HttpHealthProbe::new(ctx.config.server.health_url(), PROBE_TIMEOUT)?;

    let monitor = Arc::new(ConnectivityMonitor::new(false));
    monitor.check(&probe).await;

    let (stop_tx, stop_rx) = signal::channel(false);
    let health_interval = Duration::from_secs(ctx.config.sync.health_check_interval_secs.max(1));
    let poller = {
        let monitor = Arc::clone(&monitor);
        tokio::spawn(async move { monitor.poll(&probe, health_interval, stop_rx).await })
    };

    let periodic = args
        .interval
        .unwrap_or(ctx.config.sync.periodic_interval_secs)
        .max(1);
    let (trigger_loop, _manual) = TriggerLoop::new(engine, monitor.subscribe(), ctx.background());
    let trigger_loop = trigger_loop.with_periodic_interval(Duration::from_secs(periodic));

    eprintln!(
        "{} {} {}",
        "Watching".cyan().bold(),
        ctx.config.server.base_url,
        "(Ctrl-C to stop)".dimmed()
    );
    if !monitor.is_online() {
        eprintln!("{}", "Server unreachable; waiting for connectivity".yellow());
    }

    trigger_loop
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    let _ = stop_tx.send(true);
    let _ = poller.await;
    Ok("Stopped".dimmed().to_string())
}
