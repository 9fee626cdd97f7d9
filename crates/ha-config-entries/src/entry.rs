//! Config Entry types
//!
//! A ConfigEntry represents a single instance of an integration's configuration.
//! `R` is the integration's runtime data type (its coordinator, client, ...),
//! attached while the entry is loaded.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::manager::ConfigEntries;

/// Config entry lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfigEntryState {
    /// Initial state, not yet set up
    #[default]
    NotLoaded,
    /// Setup is running
    SetupInProgress,
    /// Successfully set up
    Loaded,
    /// Setup failed or was declined; stays here until reloaded
    SetupError,
    /// Setup hit a transient failure and is scheduled to run again
    SetupRetry,
    /// Unload is running
    UnloadInProgress,
    /// The integration refused to unload (terminal)
    FailedUnload,
}

impl ConfigEntryState {
    /// Whether the entry can be unloaded/reloaded from this state
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ConfigEntryState::Loaded
                | ConfigEntryState::SetupError
                | ConfigEntryState::SetupRetry
                | ConfigEntryState::NotLoaded
        )
    }
}

/// Source of the config entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfigEntrySource {
    /// Configured via UI/API
    #[default]
    User,
    /// Imported from YAML config
    Import,
    /// Created by the system (e.g. onboarding creates the home forecast)
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigEntryDisabledBy {
    User,
}

/// Cleanup registered with [`ConfigEntry::on_unload`]
pub type UnloadHook = Box<dyn FnOnce() + Send>;

/// Called after the entry's data or options change
pub type UpdateListener<R> =
    Arc<dyn Fn(Arc<ConfigEntries<R>>, ConfigEntry<R>) -> BoxFuture<'static, ()> + Send + Sync>;

/// Callbacks shared by every copy of an entry
struct EntryHooks<R> {
    on_unload: Mutex<Vec<UnloadHook>>,
    update_listeners: Mutex<Vec<(u64, UpdateListener<R>)>>,
    next_listener_id: AtomicU64,
}

impl<R> Default for EntryHooks<R> {
    fn default() -> Self {
        Self {
            on_unload: Mutex::new(Vec::new()),
            update_listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// A configuration entry for an integration
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ConfigEntry<R = ()> {
    /// Unique identifier (ULID)
    pub entry_id: String,

    /// Integration domain (e.g. "met")
    pub domain: String,

    /// Human-readable display name
    pub title: String,

    /// Configuration data set when the entry was created
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,

    /// User-configurable options
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,

    /// Optional unique identifier for duplicate prevention
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,

    #[serde(default)]
    pub source: ConfigEntrySource,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_by: Option<ConfigEntryDisabledBy>,

    /// Current lifecycle state (not persisted)
    #[serde(skip, default)]
    pub state: ConfigEntryState,

    /// Human-readable explanation for failed states
    #[serde(skip, default)]
    pub reason: Option<String>,

    /// Consecutive setup retries (not persisted)
    #[serde(skip, default)]
    pub tries: u32,

    /// Integration state while loaded (not persisted)
    #[serde(skip)]
    pub runtime_data: Option<Arc<R>>,

    #[serde(skip)]
    hooks: Arc<EntryHooks<R>>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub modified_at: DateTime<Utc>,
}

impl<R> Clone for ConfigEntry<R> {
    fn clone(&self) -> Self {
        Self {
            entry_id: self.entry_id.clone(),
            domain: self.domain.clone(),
            title: self.title.clone(),
            data: self.data.clone(),
            options: self.options.clone(),
            unique_id: self.unique_id.clone(),
            source: self.source.clone(),
            disabled_by: self.disabled_by,
            state: self.state,
            reason: self.reason.clone(),
            tries: self.tries,
            runtime_data: self.runtime_data.clone(),
            hooks: self.hooks.clone(),
            created_at: self.created_at,
            modified_at: self.modified_at,
        }
    }
}

impl<R> fmt::Debug for ConfigEntry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigEntry")
            .field("entry_id", &self.entry_id)
            .field("domain", &self.domain)
            .field("title", &self.title)
            .field("data", &self.data)
            .field("options", &self.options)
            .field("state", &self.state)
            .field("reason", &self.reason)
            .field("has_runtime_data", &self.runtime_data.is_some())
            .finish_non_exhaustive()
    }
}

impl<R> ConfigEntry<R> {
    /// Create a new config entry
    pub fn new(domain: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            entry_id: ulid::Ulid::new().to_string(),
            domain: domain.into(),
            title: title.into(),
            data: HashMap::new(),
            options: HashMap::new(),
            unique_id: None,
            source: ConfigEntrySource::User,
            disabled_by: None,
            state: ConfigEntryState::NotLoaded,
            reason: None,
            tries: 0,
            runtime_data: None,
            hooks: Arc::default(),
            created_at: now,
            modified_at: now,
        }
    }

    pub fn with_data(mut self, data: HashMap<String, serde_json::Value>) -> Self {
        self.data = data;
        self
    }

    /// Set a single data value
    pub fn with_data_value(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    pub fn with_unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = Some(unique_id.into());
        self
    }

    pub fn with_source(mut self, source: ConfigEntrySource) -> Self {
        self.source = source;
        self
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled_by.is_some()
    }

    pub fn is_loaded(&self) -> bool {
        self.state == ConfigEntryState::Loaded
    }

    /// Boolean from `data`; missing or non-boolean values read as `default`
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.data
            .get(key)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(default)
    }

    /// String from `data`
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(serde_json::Value::as_str)
    }

    /// Number from `data`
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(serde_json::Value::as_f64)
    }

    /// Attempt a validated state transition, updating `reason` and `tries`
    pub fn try_set_state(
        &mut self,
        new_state: ConfigEntryState,
        reason: Option<String>,
    ) -> Result<(), crate::state_machine::InvalidTransition> {
        self.state.try_transition(new_state)?;

        self.state = new_state;
        self.reason = reason;

        if !matches!(
            new_state,
            ConfigEntryState::SetupRetry | ConfigEntryState::SetupInProgress
        ) {
            self.tries = 0;
        }

        Ok(())
    }

    /// Run `hook` when the entry is unloaded, or when its setup fails after
    /// the hook was registered
    pub fn on_unload(&self, hook: impl FnOnce() + Send + 'static) {
        lock(&self.hooks.on_unload).push(Box::new(hook));
    }

    /// Call `listener` whenever the entry's data or options are updated.
    ///
    /// Returns the hook that removes the listener again; pass it to
    /// [`on_unload`](Self::on_unload) to tie the listener to this load.
    pub fn add_update_listener(&self, listener: UpdateListener<R>) -> UnloadHook
    where
        R: Send + Sync + 'static,
    {
        let id = self.hooks.next_listener_id.fetch_add(1, Ordering::SeqCst);
        lock(&self.hooks.update_listeners).push((id, listener));

        let hooks = Arc::downgrade(&self.hooks);
        Box::new(move || {
            if let Some(hooks) = hooks.upgrade() {
                lock(&hooks.update_listeners).retain(|(listener_id, _)| *listener_id != id);
            }
        })
    }

    /// Currently registered update listeners
    pub fn update_listeners(&self) -> Vec<UpdateListener<R>> {
        lock(&self.hooks.update_listeners)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect()
    }

    /// Drain and run the unload hooks in registration order
    pub(crate) fn run_unload_hooks(&self) -> usize {
        let hooks: Vec<UnloadHook> = std::mem::take(&mut *lock(&self.hooks.on_unload));
        let count = hooks.len();
        for hook in hooks {
            hook();
        }
        count
    }
}

/// Update data for a config entry
#[derive(Debug, Default)]
pub struct ConfigEntryUpdate {
    pub title: Option<String>,
    pub data: Option<HashMap<String, serde_json::Value>>,
    pub options: Option<HashMap<String, serde_json::Value>>,
    pub unique_id: Option<Option<String>>,
}

impl ConfigEntryUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn data(mut self, data: HashMap<String, serde_json::Value>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn options(mut self, options: HashMap<String, serde_json::Value>) -> Self {
        self.options = Some(options);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_config_entry_new() {
        let entry: ConfigEntry = ConfigEntry::new("met", "Home");
        assert_eq!(entry.domain, "met");
        assert_eq!(entry.title, "Home");
        assert_eq!(entry.state, ConfigEntryState::NotLoaded);
        assert!(entry.runtime_data.is_none());
        assert!(!entry.entry_id.is_empty());
    }

    #[test]
    fn test_data_accessors() {
        let entry: ConfigEntry = ConfigEntry::new("met", "Backyard")
            .with_data_value("track_home", json!(true))
            .with_data_value("name", json!("Backyard"))
            .with_data_value("latitude", json!(59.9));

        assert!(entry.get_bool("track_home", false));
        assert!(!entry.get_bool("missing", false));
        assert!(!entry.get_bool("name", false));
        assert_eq!(entry.get_str("name"), Some("Backyard"));
        assert_eq!(entry.get_f64("latitude"), Some(59.9));
        assert_eq!(entry.get_str("latitude"), None);
    }

    #[test]
    fn test_unload_hooks_run_once_in_order() {
        let entry: ConfigEntry = ConfigEntry::new("met", "Home");
        let order = Arc::new(Mutex::new(Vec::new()));

        for n in 0..3 {
            let order = order.clone();
            entry.on_unload(move || order.lock().unwrap().push(n));
        }

        // Hooks are shared between copies of the entry
        let copy = entry.clone();
        assert_eq!(copy.run_unload_hooks(), 3);
        assert_eq!(entry.run_unload_hooks(), 0);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_update_listener_removal_hook() {
        let entry: ConfigEntry = ConfigEntry::new("met", "Home");
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let listener: UpdateListener<()> = Arc::new(
            move |_entries: Arc<ConfigEntries<()>>, _entry: ConfigEntry<()>| {
                counter.fetch_add(1, Ordering::SeqCst);
                async {}.boxed()
            },
        );

        let remove = entry.add_update_listener(listener);
        assert_eq!(entry.update_listeners().len(), 1);

        entry.on_unload(remove);
        entry.run_unload_hooks();
        assert!(entry.update_listeners().is_empty());
    }

    #[test]
    fn test_state_recoverable() {
        assert!(ConfigEntryState::NotLoaded.is_recoverable());
        assert!(ConfigEntryState::Loaded.is_recoverable());
        assert!(ConfigEntryState::SetupError.is_recoverable());
        assert!(ConfigEntryState::SetupRetry.is_recoverable());

        assert!(!ConfigEntryState::SetupInProgress.is_recoverable());
        assert!(!ConfigEntryState::UnloadInProgress.is_recoverable());
        assert!(!ConfigEntryState::FailedUnload.is_recoverable());
    }

    #[test]
    fn test_runtime_data_is_not_persisted() {
        let mut entry: ConfigEntry<String> = ConfigEntry::new("met", "Home")
            .with_unique_id("home")
            .with_source(ConfigEntrySource::System)
            .with_data_value("track_home", json!(true));
        entry.runtime_data = Some(Arc::new("coordinator".to_string()));

        let json = serde_json::to_string(&entry).unwrap();
        let parsed: ConfigEntry<String> = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.entry_id, entry.entry_id);
        assert_eq!(parsed.unique_id.as_deref(), Some("home"));
        assert_eq!(parsed.source, ConfigEntrySource::System);
        assert!(parsed.get_bool("track_home", false));
        assert!(parsed.runtime_data.is_none());
    }
}
