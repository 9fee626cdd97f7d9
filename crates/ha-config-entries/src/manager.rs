//! Config Entries Manager
//!
//! Manages the lifecycle of configuration entries.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::{DashMap, DashSet};
use ha_core::Platform;
use ha_hass::HomeAssistant;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::entry::{ConfigEntry, ConfigEntryState, ConfigEntryUpdate};
use crate::error::{ConfigEntriesError, ConfigEntriesResult, ConfigEntryError};
use crate::handler::{IntegrationHandler, PlatformHandler, SetupOutcome};
use crate::state_machine::calculate_retry_delay;

/// Config Entries Manager
///
/// Manages the lifecycle of configuration entries including:
/// - Entry creation, update and removal
/// - Setup through the domain's [`IntegrationHandler`], with retry
/// - Forwarding setup/unload to [`PlatformHandler`]s
/// - Running update listeners and unload hooks
///
/// Always used behind an `Arc`; handlers receive that `Arc` so they can
/// forward platforms or reload entries later.
pub struct ConfigEntries<R> {
    hass: Arc<HomeAssistant>,

    /// Primary index: entry_id -> ConfigEntry
    entries: DashMap<String, ConfigEntry<R>>,

    /// Index: domain -> set of entry_ids
    by_domain: DashMap<String, HashSet<String>>,

    /// Index: (domain, unique_id) -> entry_id
    by_unique_id: DashMap<(String, String), String>,

    /// Serializes setup and unload
    setup_lock: Mutex<()>,

    integrations: DashMap<String, Arc<dyn IntegrationHandler<R>>>,

    platforms: DashMap<(String, Platform), Arc<dyn PlatformHandler<R>>>,

    /// entry_id -> platforms set up for it
    loaded_platforms: DashMap<String, HashSet<Platform>>,

    /// Entries whose setup failed authentication
    reauth: DashSet<String>,
}

impl<R: Send + Sync + 'static> ConfigEntries<R> {
    pub fn new(hass: Arc<HomeAssistant>) -> Arc<Self> {
        Arc::new(Self {
            hass,
            entries: DashMap::new(),
            by_domain: DashMap::new(),
            by_unique_id: DashMap::new(),
            setup_lock: Mutex::new(()),
            integrations: DashMap::new(),
            platforms: DashMap::new(),
            loaded_platforms: DashMap::new(),
            reauth: DashSet::new(),
        })
    }

    pub fn hass(&self) -> &Arc<HomeAssistant> {
        &self.hass
    }

    /// Register the handler that sets up entries of `domain`
    pub fn register_integration(&self, domain: &str, handler: Arc<dyn IntegrationHandler<R>>) {
        self.integrations.insert(domain.to_string(), handler);
        debug!("Registered integration handler for domain: {}", domain);
    }

    /// Register the handler for one entity platform of `domain`
    pub fn register_platform(
        &self,
        domain: &str,
        platform: Platform,
        handler: Arc<dyn PlatformHandler<R>>,
    ) {
        self.platforms
            .insert((domain.to_string(), platform), handler);
        debug!("Registered {} platform for domain: {}", platform, domain);
    }

    fn index_entry(&self, entry: &ConfigEntry<R>) {
        let entry_id = entry.entry_id.clone();

        self.entries.insert(entry_id.clone(), entry.clone());

        self.by_domain
            .entry(entry.domain.clone())
            .or_default()
            .insert(entry_id.clone());

        if let Some(ref unique_id) = entry.unique_id {
            self.by_unique_id
                .insert((entry.domain.clone(), unique_id.clone()), entry_id);
        }
    }

    fn unindex_entry(&self, entry: &ConfigEntry<R>) {
        if let Some(mut ids) = self.by_domain.get_mut(&entry.domain) {
            ids.remove(&entry.entry_id);
        }

        if let Some(ref unique_id) = entry.unique_id {
            self.by_unique_id
                .remove(&(entry.domain.clone(), unique_id.clone()));
        }

        self.entries.remove(&entry.entry_id);
    }

    pub fn get(&self, entry_id: &str) -> Option<ConfigEntry<R>> {
        self.entries.get(entry_id).map(|r| r.value().clone())
    }

    pub fn get_by_domain(&self, domain: &str) -> Vec<ConfigEntry<R>> {
        let ids: Vec<String> = self
            .by_domain
            .get(domain)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default();
        ids.iter().filter_map(|id| self.get(id)).collect()
    }

    pub fn get_by_unique_id(&self, domain: &str, unique_id: &str) -> Option<ConfigEntry<R>> {
        let entry_id = self
            .by_unique_id
            .get(&(domain.to_string(), unique_id.to_string()))
            .map(|r| r.value().clone())?;
        self.get(&entry_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether setup of this entry failed authentication
    pub fn reauth_pending(&self, entry_id: &str) -> bool {
        self.reauth.contains(entry_id)
    }

    /// Add a new config entry (not set up yet)
    pub fn add(&self, entry: ConfigEntry<R>) -> ConfigEntriesResult<ConfigEntry<R>> {
        if let Some(ref unique_id) = entry.unique_id {
            if self.get_by_unique_id(&entry.domain, unique_id).is_some() {
                return Err(ConfigEntriesError::AlreadyExists {
                    domain: entry.domain.clone(),
                    unique_id: unique_id.clone(),
                });
            }
        }

        self.index_entry(&entry);

        info!(
            "Added config entry: {} ({}) [{}]",
            entry.title, entry.domain, entry.entry_id
        );

        Ok(entry)
    }

    /// Update an entry. When data or options change on a loaded entry its
    /// update listeners run before this returns.
    #[instrument(skip(self, update))]
    pub async fn update(
        self: &Arc<Self>,
        entry_id: &str,
        update: ConfigEntryUpdate,
    ) -> ConfigEntriesResult<ConfigEntry<R>> {
        let entry = self
            .get(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;

        self.unindex_entry(&entry);

        let mut updated = entry;
        let mut changed = false;
        if let Some(title) = update.title {
            updated.title = title;
        }
        if let Some(data) = update.data {
            changed |= data != updated.data;
            updated.data = data;
        }
        if let Some(options) = update.options {
            changed |= options != updated.options;
            updated.options = options;
        }
        if let Some(unique_id) = update.unique_id {
            updated.unique_id = unique_id;
        }
        updated.modified_at = Utc::now();

        self.index_entry(&updated);
        debug!("Updated config entry: {}", entry_id);

        if changed && updated.is_loaded() {
            for listener in updated.update_listeners() {
                listener(self.clone(), updated.clone()).await;
            }
        }

        Ok(self.get(entry_id).unwrap_or(updated))
    }

    /// Unload (if needed) and forget an entry
    pub async fn remove(self: &Arc<Self>, entry_id: &str) -> ConfigEntriesResult<ConfigEntry<R>> {
        let entry = self
            .get(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;

        if entry.state != ConfigEntryState::NotLoaded {
            self.unload(entry_id).await?;
        }

        self.unindex_entry(&entry);
        self.reauth.remove(entry_id);

        info!(
            "Removed config entry: {} ({}) [{}]",
            entry.title, entry.domain, entry_id
        );

        Ok(entry)
    }

    fn transition(
        &self,
        entry_id: &str,
        state: ConfigEntryState,
        reason: Option<String>,
    ) -> ConfigEntriesResult<()> {
        let mut entry = self
            .entries
            .get_mut(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;
        entry.try_set_state(state, reason)?;
        debug!("Entry {} state changed to {:?}", entry_id, state);
        Ok(())
    }

    fn set_runtime_data(&self, entry_id: &str, runtime_data: Option<Arc<R>>) {
        if let Some(mut entry) = self.entries.get_mut(entry_id) {
            entry.runtime_data = runtime_data;
        }
    }

    /// Set up an entry through its domain's integration handler.
    ///
    /// Integration failures do not surface as errors here; they decide the
    /// state the entry ends up in, which is returned.
    #[instrument(skip(self))]
    pub async fn setup(self: &Arc<Self>, entry_id: &str) -> ConfigEntriesResult<ConfigEntryState> {
        let _lock = self.setup_lock.lock().await;

        let mut entry = self
            .get(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;

        if entry.is_disabled() {
            debug!("Skipping setup for disabled entry: {}", entry_id);
            return Ok(entry.state);
        }

        self.transition(entry_id, ConfigEntryState::SetupInProgress, None)?;

        let handler = self.integrations.get(&entry.domain).map(|h| h.value().clone());
        let Some(handler) = handler else {
            debug!(
                "No integration handler for domain {}, marking as loaded",
                entry.domain
            );
            self.transition(entry_id, ConfigEntryState::Loaded, None)?;
            return Ok(ConfigEntryState::Loaded);
        };

        let result = handler.setup_entry(self, &mut entry).await;

        let state = match result {
            Ok(SetupOutcome::Loaded) => {
                self.set_runtime_data(entry_id, entry.runtime_data.clone());
                self.reauth.remove(entry_id);
                self.transition(entry_id, ConfigEntryState::Loaded, None)?;
                info!("Setup completed for entry: {} ({})", entry.title, entry_id);
                ConfigEntryState::Loaded
            }
            Ok(SetupOutcome::NotReady) => {
                entry.run_unload_hooks();
                self.transition(
                    entry_id,
                    ConfigEntryState::SetupError,
                    Some("Setup declined by integration".to_string()),
                )?;
                ConfigEntryState::SetupError
            }
            Err(ConfigEntryError::NotReady(reason)) => {
                entry.run_unload_hooks();
                self.transition(entry_id, ConfigEntryState::SetupRetry, Some(reason.clone()))?;
                let tries = self
                    .entries
                    .get_mut(entry_id)
                    .map(|mut e| {
                        e.tries += 1;
                        e.tries
                    })
                    .unwrap_or(1);
                let delay = calculate_retry_delay(tries - 1);
                warn!(
                    "Config entry {} ({}) not ready, retrying in {:.0}s: {}",
                    entry.title, entry_id, delay, reason
                );
                self.schedule_retry(entry_id.to_string(), Duration::from_secs_f64(delay));
                ConfigEntryState::SetupRetry
            }
            Err(ConfigEntryError::AuthFailed(reason)) => {
                entry.run_unload_hooks();
                warn!(
                    "Authentication failed for entry {} ({}): {}",
                    entry.title, entry_id, reason
                );
                self.reauth.insert(entry_id.to_string());
                self.transition(entry_id, ConfigEntryState::SetupError, Some(reason))?;
                ConfigEntryState::SetupError
            }
            Err(ConfigEntryError::Error(reason)) => {
                entry.run_unload_hooks();
                warn!("Setup failed for entry {}: {}", entry_id, reason);
                self.transition(entry_id, ConfigEntryState::SetupError, Some(reason))?;
                ConfigEntryState::SetupError
            }
        };

        Ok(state)
    }

    fn schedule_retry(self: &Arc<Self>, entry_id: String, delay: Duration) {
        let manager = Arc::downgrade(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let Some(manager) = manager.upgrade() else {
                return;
            };
            let still_waiting = manager
                .get(&entry_id)
                .is_some_and(|e| e.state == ConfigEntryState::SetupRetry);
            if !still_waiting {
                return;
            }

            if let Err(err) = manager.setup(&entry_id).await {
                warn!("Retrying setup of {} failed: {}", entry_id, err);
            }
        });
    }

    /// Unload an entry.
    ///
    /// Loaded entries go through the integration's unload; on success the
    /// unload hooks run and runtime data is dropped. Entries that never
    /// loaded (error or pending retry) go straight back to `NotLoaded`.
    #[instrument(skip(self))]
    pub async fn unload(self: &Arc<Self>, entry_id: &str) -> ConfigEntriesResult<ConfigEntryState> {
        let _lock = self.setup_lock.lock().await;

        let entry = self
            .get(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;

        if entry.state == ConfigEntryState::NotLoaded {
            return Ok(ConfigEntryState::NotLoaded);
        }
        if !entry.state.is_recoverable() {
            return Err(ConfigEntriesError::CannotUnload(entry.state));
        }

        let was_loaded = entry.is_loaded();
        self.transition(entry_id, ConfigEntryState::UnloadInProgress, None)?;

        let handler = self.integrations.get(&entry.domain).map(|h| h.value().clone());
        let unloaded = match handler {
            Some(handler) if was_loaded => handler.unload_entry(self, &entry).await,
            _ => true,
        };

        if !unloaded {
            warn!("Integration refused to unload entry: {} ({})", entry.title, entry_id);
            self.transition(
                entry_id,
                ConfigEntryState::FailedUnload,
                Some("Unload failed".to_string()),
            )?;
            return Ok(ConfigEntryState::FailedUnload);
        }

        let hooks = entry.run_unload_hooks();
        self.set_runtime_data(entry_id, None);
        self.loaded_platforms.remove(entry_id);
        self.transition(entry_id, ConfigEntryState::NotLoaded, None)?;

        info!(
            "Unloaded entry: {} ({}), ran {} unload hooks",
            entry.title, entry_id, hooks
        );
        Ok(ConfigEntryState::NotLoaded)
    }

    /// Reload an entry (unload + setup)
    pub async fn reload(self: &Arc<Self>, entry_id: &str) -> ConfigEntriesResult<ConfigEntryState> {
        self.unload(entry_id).await?;
        self.setup(entry_id).await
    }

    /// Set up every platform in `platforms` for an entry that is being set up
    pub async fn forward_entry_setups(
        self: &Arc<Self>,
        entry: &ConfigEntry<R>,
        platforms: &[Platform],
    ) -> Result<(), ConfigEntryError> {
        info!(
            "Forward entry setup for {} ({}): {:?}",
            entry.domain, entry.entry_id, platforms
        );

        for &platform in platforms {
            let handler = self
                .platforms
                .get(&(entry.domain.clone(), platform))
                .map(|h| h.value().clone());
            let Some(handler) = handler else {
                warn!("No {} platform registered for {}", platform, entry.domain);
                continue;
            };

            handler.setup_entry(self, entry).await?;
            self.loaded_platforms
                .entry(entry.entry_id.clone())
                .or_default()
                .insert(platform);
            debug!("Platform {} setup complete for {}", platform, entry.domain);
        }

        Ok(())
    }

    /// Unload platforms previously set up for an entry. True when all of
    /// them unloaded.
    pub async fn unload_platforms(
        self: &Arc<Self>,
        entry: &ConfigEntry<R>,
        platforms: &[Platform],
    ) -> bool {
        info!(
            "Unload platforms for {} ({}): {:?}",
            entry.domain, entry.entry_id, platforms
        );

        let mut all_unloaded = true;
        for &platform in platforms {
            let was_loaded = self
                .loaded_platforms
                .get_mut(&entry.entry_id)
                .is_some_and(|mut loaded| loaded.remove(&platform));
            if !was_loaded {
                continue;
            }

            let handler = self
                .platforms
                .get(&(entry.domain.clone(), platform))
                .map(|h| h.value().clone());
            if let Some(handler) = handler {
                all_unloaded &= handler.unload_entry(self, entry).await;
            }
        }

        all_unloaded
    }

    /// Platforms currently set up for an entry
    pub fn loaded_platforms(&self, entry_id: &str) -> HashSet<Platform> {
        self.loaded_platforms
            .get(entry_id)
            .map(|p| p.value().clone())
            .unwrap_or_default()
    }

    /// Set up every entry, returning the resulting states
    pub async fn setup_all(self: &Arc<Self>) -> Vec<ConfigEntriesResult<ConfigEntryState>> {
        let entry_ids: Vec<String> = self.entries.iter().map(|r| r.key().clone()).collect();
        let mut results = Vec::with_capacity(entry_ids.len());

        for entry_id in entry_ids {
            results.push(self.setup(&entry_id).await);
        }

        results
    }
}
