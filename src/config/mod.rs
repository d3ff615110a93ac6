//! Configuration management for repsync.
//!
//! This module handles loading and saving configuration from `~/.repsync/`.

mod paths;
mod settings;

pub use paths::{Paths, HOME_ENV};
pub use settings::{AuthConfig, ColorSetting, Config, GeneralConfig, LogConfig, ServerConfig, SyncConfig};
