//! Integration and platform hooks
//!
//! An integration registers one [`IntegrationHandler`] for its domain and one
//! [`PlatformHandler`] per entity platform it forwards its entries to.

use async_trait::async_trait;
use std::sync::Arc;

use crate::entry::ConfigEntry;
use crate::error::ConfigEntryError;
use crate::manager::ConfigEntries;

/// Result of a setup that did not raise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupOutcome {
    /// The entry is set up
    Loaded,
    /// The integration declined to set up this entry. The entry stays in
    /// `SetupError` and is not retried until it is reloaded.
    NotReady,
}

#[async_trait]
pub trait IntegrationHandler<R: Send + Sync + 'static>: Send + Sync {
    /// Set up an entry. Store runtime data on `entry`; the manager keeps it
    /// once setup reports [`SetupOutcome::Loaded`].
    async fn setup_entry(
        &self,
        entries: &Arc<ConfigEntries<R>>,
        entry: &mut ConfigEntry<R>,
    ) -> Result<SetupOutcome, ConfigEntryError>;

    /// Tear down a loaded entry. Returning false leaves it in `FailedUnload`.
    async fn unload_entry(&self, entries: &Arc<ConfigEntries<R>>, entry: &ConfigEntry<R>) -> bool;
}

#[async_trait]
pub trait PlatformHandler<R: Send + Sync + 'static>: Send + Sync {
    /// Create this platform's entities for an entry
    async fn setup_entry(
        &self,
        entries: &Arc<ConfigEntries<R>>,
        entry: &ConfigEntry<R>,
    ) -> Result<(), ConfigEntryError>;

    /// Remove this platform's entities for an entry
    async fn unload_entry(&self, entries: &Arc<ConfigEntries<R>>, entry: &ConfigEntry<R>) -> bool;
}
