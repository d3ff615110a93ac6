//! Feature implementations for repsync.
//!
//! - Offline queue and sync engine
//! - Write interception with offline fallback
//! - Trigger sources (connectivity, timer, background wake-up, manual)
//! - Network transport
//! - Boundary collaborators (credentials, cache, notifications)
//! - Shell completions

pub mod collab;
pub mod interceptor;
pub mod shell;
pub mod sync;
pub mod transport;
pub mod trigger;
