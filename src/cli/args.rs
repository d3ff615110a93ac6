use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};

use crate::features::shell::PromptFormat;

#[derive(Parser)]
#[command(name = "repsync")]
#[command(about = "Log workouts reliably, online or offline")]
#[command(long_about = "repsync - offline-first workout logging

Every workout you log is sent to the server right away when possible.
When the network is down, it is kept in a local queue and delivered
later, exactly once and in the order you logged it.

QUICK START:
  repsync log pushups 20          Log 20 pushups
  repsync status                  How many workouts are waiting
  repsync sync                    Deliver queued workouts now
  repsync watch                   Keep syncing in the background

OUTPUT FORMATS:
  --output pretty    Human-readable colored output (default)
  --output json      Machine-readable JSON for scripting

For more information on a specific command, run:
  repsync <command> --help")]
#[command(version, propagate_version = true)]
pub struct Cli {
    /// Output format for command results
    ///
    /// Use 'pretty' for human-readable colored output (default),
    /// or 'json' for machine-readable output suitable for scripting.
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Server base URL (overrides the config file)
    #[arg(long, env = "REPSYNC_SERVER", global = true)]
    pub server: Option<String>,

    /// Bearer token (overrides the config file)
    #[arg(long, env = "REPSYNC_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for command results.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable colored output.
    #[default]
    Pretty,
    /// Machine-readable JSON output.
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log a workout
    ///
    /// Sends the workout to the server. If the server cannot be reached,
    /// the workout is queued and delivered by the next sync.
    ///
    /// # Examples
    ///
    ///   repsync log pushups 20
    ///   repsync log squats 15 --sets 3
    ///   repsync log plank 60 --note "felt strong"
    #[command(alias = "l")]
    Log(LogArgs),

    /// Show the offline queue status
    ///
    /// Prints how many workouts are waiting, how old the oldest one is,
    /// and whether background sync is available.
    #[command(alias = "st")]
    Status,

    /// List queued workouts, oldest first
    #[command(alias = "ls")]
    List {
        /// Maximum entries to show
        #[arg(long, short = 'n', default_value = "20")]
        limit: usize,
    },

    /// Deliver queued workouts now
    ///
    /// Stops at the first entry the server cannot take right now, so
    /// nothing is delivered out of order. Entries the server rejects
    /// are discarded with a warning.
    Sync,

    /// Keep syncing until interrupted
    ///
    /// Syncs on start, whenever the server becomes reachable again,
    /// when a background wake-up was requested, and on a timer.
    Watch(WatchArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// Prompt segment with the number of unsynced workouts
    ///
    /// Prints nothing when the queue is empty.
    ///
    /// # Examples
    ///
    ///   PS1='$(repsync prompt --format icon) \$ '
    Prompt {
        /// Segment style
        #[arg(long, short = 'f', value_enum, default_value = "plain")]
        format: PromptFormat,
    },

    /// Generate shell completions
    ///
    /// # Examples
    ///
    ///   repsync completions bash > ~/.local/share/bash-completion/completions/repsync
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,

        /// Print installation instructions instead of the script
        #[arg(long)]
        install: bool,
    },
}

/// Arguments for `log`.
#[derive(Args, Debug, Clone)]
pub struct LogArgs {
    /// Exercise kind (pushups, squats, plank, ...)
    pub exercise: String,

    /// Repetitions, seconds or meters
    pub amount: u32,

    /// Number of sets
    #[arg(long, short = 's')]
    pub sets: Option<u32>,

    /// Free-form note
    #[arg(long)]
    pub note: Option<String>,
}

/// Arguments for `watch`.
#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    /// Periodic sync interval in seconds (overrides the config file)
    #[arg(long)]
    pub interval: Option<u64>,
}

/// Arguments for `config`.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

/// Configuration subcommands.
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the config file location
    Path,
}
