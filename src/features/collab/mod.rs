//! Collaborators the sync machinery talks to at its boundary.

mod cache;
mod credentials;
mod notifier;

pub use cache::{CacheInvalidator, CacheScope, FileCacheInvalidator, NoopInvalidator};
pub use credentials::{
    provider_from_config, CredentialProvider, RefreshCredentials, StaticCredentials,
};
pub use notifier::{ConsoleNotifier, Notifier, TracingNotifier};

#[cfg(test)]
pub use cache::MockCacheInvalidator;
#[cfg(test)]
pub use credentials::MockCredentialProvider;
