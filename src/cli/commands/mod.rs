//! Command implementations for repsync.
//!
//! Each command returns the text to print; `main` prints it.

mod config;
mod log;
mod sync;

pub use config::config;
pub use log::log;
pub use sync::{sync, watch};

use std::sync::Arc;

use clap_complete::Shell;

use crate::cli::args::OutputFormat;
use crate::config::{Config, Paths};
use crate::error::RepsyncError;
use crate::features::collab::{
    provider_from_config, CredentialProvider, FileCacheInvalidator, Notifier,
};
use crate::features::shell::{completion_install_instructions, generate_completions};
use crate::features::shell::{prompt_segment, PromptFormat};
use crate::features::sync::{EngineConfig, QueueStatus, QueueStore, SyncEngine};
use crate::features::transport::{HttpTransport, WriteTransport};
use crate::features::trigger::{background_from_config, BackgroundSync};
use crate::output::{format_entries, format_status};
use crate::storage::Database;

/// Everything a command needs: locations, settings and global overrides.
pub struct Context {
    /// Data directory layout.
    pub paths: Paths,
    /// Effective configuration.
    pub config: Config,
    /// Token given on the command line or via `REPSYNC_TOKEN`.
    pub token: Option<String>,
}

impl Context {
    /// Load configuration and apply command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be located or the
    /// config file is invalid.
    pub fn load(server: Option<String>, token: Option<String>) -> Result<Self, RepsyncError> {
        let paths = Paths::new()?;
        let mut config = Config::load_from_path(&paths.config_file)?;
        if let Some(url) = server {
            config.server.base_url = url;
        }
        Ok(Self {
            paths,
            config,
            token,
        })
    }

    /// Open the queue database, creating the data directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open_store(&self) -> Result<QueueStore, RepsyncError> {
        self.paths.ensure_dirs()?;
        let db = Database::open_at(&self.paths.database)?;
        QueueStore::with_database(db, self.config.sync.max_queue_size)
    }

    /// HTTP transport for the write endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn transport(&self) -> Result<Arc<dyn WriteTransport>, RepsyncError> {
        let server = &self.config.server;
        Ok(Arc::new(HttpTransport::new(
            server.workouts_url(),
            server.request_timeout(),
        )?))
    }

    /// Credential provider selected by the `auth` section.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh client cannot be built.
    pub fn credentials(&self) -> Result<Arc<dyn CredentialProvider>, RepsyncError> {
        provider_from_config(
            &self.config.auth,
            self.token.clone(),
            self.config.server.request_timeout(),
        )
    }

    /// Background-sync capability selected by the `sync` section.
    #[must_use]
    pub fn background(&self) -> Arc<dyn BackgroundSync> {
        background_from_config(&self.config.sync, &self.paths)
    }

    /// Sync engine over `store` reporting through `notifier`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport or credential provider cannot be
    /// built.
    pub fn engine(
        &self,
        store: QueueStore,
        notifier: Arc<dyn Notifier>,
    ) -> Result<SyncEngine, RepsyncError> {
        Ok(SyncEngine::new(store, self.transport()?, self.credentials()?)
            .with_cache_invalidator(Arc::new(FileCacheInvalidator::new(self.paths.cache.clone())))
            .with_notifier(notifier)
            .with_config(EngineConfig::from_config(
                &self.config.sync,
                &self.config.server,
            )))
    }
}

/// Execute the status command.
///
/// # Errors
///
/// Returns an error if the queue cannot be read.
pub async fn status(ctx: &Context, format: OutputFormat) -> Result<String, RepsyncError> {
    let store = ctx.open_store()?;

    let status = QueueStatus {
        pending: store.count().await?,
        in_flight: store.in_flight_count().await?,
        oldest_queued_at: store.oldest_queued_at().await?,
        capacity: store.max_size(),
        background_sync: ctx.background().is_supported(),
    };
    format_status(&status, format)
}

/// Execute the list command.
///
/// # Errors
///
/// Returns an error if the queue cannot be read.
pub async fn list(ctx: &Context, limit: usize, format: OutputFormat) -> Result<String, RepsyncError> {
    let store = ctx.open_store()?;
    let entries = store.list_pending().await?;
    let total = entries.len();
    let shown: Vec<_> = entries.into_iter().take(limit).collect();
    format_entries(&shown, total, format)
}

/// Execute the prompt command.
///
/// # Errors
///
/// Returns an error if the queue cannot be read.
pub async fn prompt(ctx: &Context, format: PromptFormat) -> Result<String, RepsyncError> {
    let store = ctx.open_store()?;
    prompt_segment(&store, format).await
}

/// Execute the completions command.
///
/// # Errors
///
/// Returns an error if the script cannot be generated.
pub fn completions(shell: Shell, install: bool) -> Result<String, RepsyncError> {
    if install {
        Ok(completion_install_instructions(shell))
    } else {
        generate_completions(shell)
    }
}
