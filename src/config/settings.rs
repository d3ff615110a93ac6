//! Configuration settings for repsync.
//!
//! Settings are loaded from `~/.repsync/config.yaml`. Every section is
//! optional; missing fields fall back to defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::args::OutputFormat;
use crate::config::Paths;
use crate::error::RepsyncError;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// General settings.
    pub general: GeneralConfig,
    /// Server endpoints.
    pub server: ServerConfig,
    /// Credentials.
    pub auth: AuthConfig,
    /// Sync engine and trigger settings.
    pub sync: SyncConfig,
    /// Logging settings.
    pub log: LogConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default output format.
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
    /// Color output setting.
    #[serde(default = "default_color")]
    pub color: ColorSetting,
}

/// Color output setting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColorSetting {
    /// Auto-detect based on terminal.
    #[default]
    Auto,
    /// Always use colors.
    Always,
    /// Never use colors.
    Never,
}

/// Server endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL, e.g. `https://api.example.com`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path of the idempotent "create workout" endpoint.
    #[serde(default = "default_workouts_path")]
    pub workouts_path: String,
    /// Path polled to decide whether the server is reachable.
    #[serde(default = "default_health_path")]
    pub health_path: String,
    /// Upper bound for a single write request, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Credential settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Static bearer token.
    #[serde(default)]
    pub token: Option<String>,
    /// Environment variable consulted when `token` is unset.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Endpoint exchanging `refresh_token` for a short-lived access token.
    #[serde(default)]
    pub refresh_url: Option<String>,
    /// Long-lived refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Sync engine and trigger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Pause between two sends within one run, in milliseconds.
    #[serde(default = "default_inter_request_delay")]
    pub inter_request_delay_ms: u64,
    /// Maximum number of entries the offline queue may hold.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
    /// First backoff window after a transient failure, in seconds.
    #[serde(default = "default_backoff_base")]
    pub backoff_base_secs: u64,
    /// Backoff ceiling, in seconds.
    #[serde(default = "default_backoff_max")]
    pub backoff_max_secs: u64,
    /// Periodic trigger interval for `repsync watch`, in seconds.
    #[serde(default = "default_periodic_interval")]
    pub periodic_interval_secs: u64,
    /// How often `repsync watch` probes connectivity, in seconds.
    #[serde(default = "default_health_interval")]
    pub health_check_interval_secs: u64,
    /// Register deferred background-sync wake-ups after queueing.
    #[serde(default = "default_true")]
    pub background: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default `tracing` filter directive.
    #[serde(default = "default_log_level")]
    pub level: String,
}

const fn default_output_format() -> OutputFormat {
    OutputFormat::Pretty
}

const fn default_color() -> ColorSetting {
    ColorSetting::Auto
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_workouts_path() -> String {
    "/api/workouts".to_string()
}

fn default_health_path() -> String {
    "/api/health".to_string()
}

const fn default_request_timeout() -> u64 {
    10
}

fn default_token_env() -> String {
    "REPSYNC_TOKEN".to_string()
}

const fn default_inter_request_delay() -> u64 {
    250
}

const fn default_max_queue_size() -> usize {
    1000
}

const fn default_backoff_base() -> u64 {
    5
}

const fn default_backoff_max() -> u64 {
    300
}

const fn default_periodic_interval() -> u64 {
    60
}

const fn default_health_interval() -> u64 {
    5
}

const fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: default_output_format(),
            color: default_color(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            workouts_path: default_workouts_path(),
            health_path: default_health_path(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token: None,
            token_env: default_token_env(),
            refresh_url: None,
            refresh_token: None,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            inter_request_delay_ms: default_inter_request_delay(),
            max_queue_size: default_max_queue_size(),
            backoff_base_secs: default_backoff_base(),
            backoff_max_secs: default_backoff_max(),
            periodic_interval_secs: default_periodic_interval(),
            health_check_interval_secs: default_health_interval(),
            background: default_true(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// Full URL of the write endpoint.
    #[must_use]
    pub fn workouts_url(&self) -> String {
        join_url(&self.base_url, &self.workouts_path)
    }

    /// Full URL of the health endpoint.
    #[must_use]
    pub fn health_url(&self) -> String {
        join_url(&self.base_url, &self.health_path)
    }

    /// Write request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl AuthConfig {
    /// The static token, from the config file or the configured env var.
    #[must_use]
    pub fn resolve_token(&self) -> Option<String> {
        self.token
            .clone()
            .or_else(|| std::env::var(&self.token_env).ok())
            .filter(|t| !t.trim().is_empty())
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self, RepsyncError> {
        let paths = Paths::new()?;
        Self::load_from_path(&paths.config_file)
    }

    /// Load configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load_from_path(path: &std::path::Path) -> Result<Self, RepsyncError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            RepsyncError::Config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        serde_yaml::from_str(&contents).map_err(|e| {
            RepsyncError::Config(format!(
                "Failed to parse config file {}: {e}",
                path.display()
            ))
        })
    }

    /// Save configuration to a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be written.
    pub fn save_to_path(&self, path: &std::path::Path) -> Result<(), RepsyncError> {
        let contents = serde_yaml::to_string(self)
            .map_err(|e| RepsyncError::Config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, contents).map_err(|e| {
            RepsyncError::Config(format!(
                "Failed to write config file {}: {e}",
                path.display()
            ))
        })
    }
}
