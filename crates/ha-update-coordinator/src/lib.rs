//! Data update coordinator
//!
//! A [`DataUpdateCoordinator`] owns the latest result of an [`UpdateMethod`]
//! and shares it with every entity of a config entry. It polls on a fixed
//! interval while at least one listener is attached and notifies listeners
//! after every refresh, successful or not.

use async_trait::async_trait;
use dashmap::DashMap;
use ha_config_entries::ConfigEntryError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Failure of a single update
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpdateError {
    /// Provider unreachable or returned unusable data
    #[error("update failed: {0}")]
    Failed(String),

    /// Provider rejected our credentials
    #[error("authentication failed: {0}")]
    AuthFailed(String),
}

impl From<UpdateError> for ConfigEntryError {
    fn from(err: UpdateError) -> Self {
        match err {
            UpdateError::Failed(reason) => ConfigEntryError::NotReady(reason),
            UpdateError::AuthFailed(reason) => ConfigEntryError::AuthFailed(reason),
        }
    }
}

pub type UpdateResult<T> = Result<T, UpdateError>;

/// Fetches one snapshot of data
#[async_trait]
pub trait UpdateMethod: Send + Sync + 'static {
    type Data: Send + Sync + 'static;

    async fn update(&self) -> UpdateResult<Self::Data>;
}

type Listener = Arc<dyn Fn() + Send + Sync>;

pub struct DataUpdateCoordinator<U: UpdateMethod> {
    name: String,
    method: U,
    update_interval: Duration,
    data: RwLock<Option<Arc<U::Data>>>,
    last_update_success: AtomicBool,
    listeners: DashMap<u64, Listener>,
    next_listener_id: AtomicU64,
    refresh_lock: tokio::sync::Mutex<()>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
    shut_down: AtomicBool,
}

impl<U: UpdateMethod> DataUpdateCoordinator<U> {
    pub fn new(name: impl Into<String>, method: U, update_interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            method,
            update_interval,
            data: RwLock::new(None),
            last_update_success: AtomicBool::new(true),
            listeners: DashMap::new(),
            next_listener_id: AtomicU64::new(0),
            refresh_lock: tokio::sync::Mutex::new(()),
            poll_task: Mutex::new(None),
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self) -> &U {
        &self.method
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// Latest successfully fetched data
    pub fn data(&self) -> Option<Arc<U::Data>> {
        match self.data.read() {
            Ok(data) => data.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn last_update_success(&self) -> bool {
        self.last_update_success.load(Ordering::SeqCst)
    }

    /// Fetch new data now and notify listeners.
    ///
    /// On failure the previous data is kept and `last_update_success` turns
    /// false.
    pub async fn refresh(&self) -> UpdateResult<()> {
        let _guard = self.refresh_lock.lock().await;

        let result = self.method.update().await;
        let outcome = match result {
            Ok(data) => {
                match self.data.write() {
                    Ok(mut slot) => *slot = Some(Arc::new(data)),
                    Err(poisoned) => *poisoned.into_inner() = Some(Arc::new(data)),
                }
                if !self.last_update_success.swap(true, Ordering::SeqCst) {
                    info!(coordinator = %self.name, "Fetching data recovered");
                }
                debug!(coordinator = %self.name, "Finished fetching data");
                Ok(())
            }
            Err(err) => {
                if self.last_update_success.swap(false, Ordering::SeqCst) {
                    warn!(coordinator = %self.name, %err, "Error fetching data");
                }
                Err(err)
            }
        };

        self.notify_listeners();
        outcome
    }

    /// First refresh of a config entry being set up.
    ///
    /// Failures become the [`ConfigEntryError`] that tells the config entry
    /// manager to retry or to ask for reauthentication.
    pub async fn config_entry_first_refresh(&self) -> Result<(), ConfigEntryError> {
        self.refresh().await.map_err(ConfigEntryError::from)
    }

    /// Refresh on behalf of a caller that does not handle errors
    pub async fn request_refresh(&self) {
        if self.shut_down.load(Ordering::SeqCst) {
            debug!(coordinator = %self.name, "Ignoring refresh request after shutdown");
            return;
        }
        if let Err(err) = self.refresh().await {
            debug!(coordinator = %self.name, %err, "Requested refresh failed");
        }
    }

    fn notify_listeners(&self) {
        let listeners: Vec<Listener> = self.listeners.iter().map(|l| l.value().clone()).collect();
        for listener in listeners {
            listener();
        }
    }

    /// Call `listener` after every refresh. Polling starts with the first
    /// listener.
    pub fn add_listener(self: &Arc<Self>, listener: impl Fn() + Send + Sync + 'static) -> u64 {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        let first = self.listeners.is_empty();
        self.listeners.insert(id, Arc::new(listener));

        if first && !self.shut_down.load(Ordering::SeqCst) {
            self.start_polling();
        }
        id
    }

    /// Polling stops when the last listener is removed
    pub fn remove_listener(&self, id: u64) {
        self.listeners.remove(&id);
        if self.listeners.is_empty() {
            self.stop_polling();
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_polling(&self) -> bool {
        self.lock_poll_task()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    fn lock_poll_task(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        match self.poll_task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn start_polling(self: &Arc<Self>) {
        let coordinator = Arc::downgrade(self);
        let interval = self.update_interval;
        debug!(coordinator = %self.name, ?interval, "Starting polling");

        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let Some(coordinator) = coordinator.upgrade() else {
                    break;
                };
                // Errors are logged by refresh and reflected in last_update_success
                let _ = coordinator.refresh().await;
            }
        });

        if let Some(previous) = self.lock_poll_task().replace(task) {
            previous.abort();
        }
    }

    fn stop_polling(&self) {
        if let Some(task) = self.lock_poll_task().take() {
            debug!(coordinator = %self.name, "Stopping polling");
            task.abort();
        }
    }

    /// Stop polling and drop every listener
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        self.stop_polling();
        self.listeners.clear();
    }
}

impl<U: UpdateMethod> Drop for DataUpdateCoordinator<U> {
    fn drop(&mut self) {
        self.stop_polling();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio_test::{assert_err, assert_ok};

    #[derive(Default)]
    struct Counter {
        calls: AtomicUsize,
        fail: Mutex<Option<UpdateError>>,
    }

    #[async_trait]
    impl UpdateMethod for Counter {
        type Data = usize;

        async fn update(&self) -> UpdateResult<usize> {
            if let Some(err) = self.fail.lock().unwrap().clone() {
                return Err(err);
            }
            Ok(self.calls.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    fn coordinator(interval: Duration) -> Arc<DataUpdateCoordinator<Counter>> {
        DataUpdateCoordinator::new("test", Counter::default(), interval)
    }

    #[tokio::test]
    async fn test_refresh_stores_data() {
        let coordinator = coordinator(Duration::from_secs(60));
        assert!(coordinator.data().is_none());

        assert_ok!(coordinator.refresh().await);
        assert_eq!(coordinator.data().as_deref(), Some(&1));
        assert!(coordinator.last_update_success());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_data() {
        let coordinator = coordinator(Duration::from_secs(60));
        coordinator.refresh().await.unwrap();

        *coordinator.method().fail.lock().unwrap() = Some(UpdateError::Failed("timeout".into()));
        assert_err!(coordinator.refresh().await);

        assert_eq!(coordinator.data().as_deref(), Some(&1));
        assert!(!coordinator.last_update_success());
    }

    #[tokio::test]
    async fn test_first_refresh_error_mapping() {
        let coordinator = coordinator(Duration::from_secs(60));

        *coordinator.method().fail.lock().unwrap() = Some(UpdateError::Failed("down".into()));
        assert_eq!(
            coordinator.config_entry_first_refresh().await,
            Err(ConfigEntryError::NotReady("down".into()))
        );

        *coordinator.method().fail.lock().unwrap() = Some(UpdateError::AuthFailed("403".into()));
        assert_eq!(
            coordinator.config_entry_first_refresh().await,
            Err(ConfigEntryError::AuthFailed("403".into()))
        );
    }

    #[tokio::test]
    async fn test_listeners_notified_on_success_and_failure() {
        let coordinator = coordinator(Duration::from_secs(3600));
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = notified.clone();
        let id = coordinator.add_listener(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        coordinator.refresh().await.unwrap();
        *coordinator.method().fail.lock().unwrap() = Some(UpdateError::Failed("x".into()));
        coordinator.request_refresh().await;
        assert_eq!(notified.load(Ordering::SeqCst), 2);

        coordinator.remove_listener(id);
        coordinator.request_refresh().await;
        assert_eq!(notified.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_polls_only_while_listened() {
        let coordinator = coordinator(Duration::from_millis(20));
        assert!(!coordinator.is_polling());

        let id = coordinator.add_listener(|| {});
        assert!(coordinator.is_polling());
        tokio::time::sleep(Duration::from_millis(90)).await;
        assert!(coordinator.method().calls.load(Ordering::SeqCst) >= 2);

        coordinator.remove_listener(id);
        assert!(!coordinator.is_polling());
        let calls = coordinator.method().calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(coordinator.method().calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn test_shutdown_stops_everything() {
        let coordinator = coordinator(Duration::from_millis(20));
        coordinator.add_listener(|| {});

        coordinator.shutdown();
        assert!(!coordinator.is_polling());
        assert_eq!(coordinator.listener_count(), 0);

        coordinator.request_refresh().await;
        assert_eq!(coordinator.method().calls.load(Ordering::SeqCst), 0);
    }
}
