//! repsync - offline-first workout logging
//!
//! This crate records workout logs reliably when connectivity is missing or
//! intermittent. Writes that cannot reach the server are kept in a durable
//! local queue and replayed later, in order and exactly once, by a sync
//! engine driven by connectivity, timer, background and manual triggers.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod features;
pub mod logging;
pub mod output;
pub mod storage;

pub use cli::args::{Cli, Commands, OutputFormat};
pub use error::RepsyncError;
pub use features::interceptor::{Submission, WriteInterceptor};
pub use features::sync::{Operation, QueueStore, RunOutcome, SyncEngine, SyncReport};
pub use features::trigger::{Trigger, TriggerHandle, TriggerLoop};
