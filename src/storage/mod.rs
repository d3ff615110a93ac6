//! Storage layer for repsync.
//!
//! SQLite-based persistence for the offline write queue.

mod database;
mod migrations;

pub use database::Database;
