//! Coordinator polling met.no for one config entry

use async_trait::async_trait;
use ha_config::CoreConfig;
use ha_config_entries::{ConfigEntry, ConfigEntryError};
use ha_core::events::{CoreConfigUpdateData, CORE_CONFIG_UPDATE};
use ha_core::Event;
use ha_event_bus::ListenerHandle;
use ha_hass::HomeAssistant;
use ha_update_coordinator::{DataUpdateCoordinator, UpdateMethod, UpdateResult};
use rand::Rng;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::api::{Location, MetWeatherApi, MetWeatherData};
use crate::consts::{CONF_ELEVATION, CONF_LATITUDE, CONF_LONGITUDE, CONF_TRACK_HOME, DOMAIN};

/// Fetches weather for a location that may move
pub struct MetWeatherUpdater {
    api: Arc<dyn MetWeatherApi>,
    location: RwLock<Location>,
}

impl MetWeatherUpdater {
    pub fn location(&self) -> Location {
        match self.location.read() {
            Ok(location) => *location,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_location(&self, location: Location) {
        match self.location.write() {
            Ok(mut slot) => *slot = location,
            Err(poisoned) => *poisoned.into_inner() = location,
        }
    }
}

#[async_trait]
impl UpdateMethod for MetWeatherUpdater {
    type Data = MetWeatherData;

    async fn update(&self) -> UpdateResult<MetWeatherData> {
        let location = self.location();
        debug!(
            latitude = location.latitude,
            longitude = location.longitude,
            "Fetching met.no weather"
        );
        Ok(self.api.fetch(location).await?)
    }
}

fn home_location(config: &CoreConfig) -> Location {
    Location {
        latitude: config.latitude,
        longitude: config.longitude,
        elevation: config.elevation,
    }
}

/// Location an entry's weather is fetched for: the home location when it
/// tracks home, else its own coordinates with the home location filling gaps
pub fn entry_location<R>(config: &CoreConfig, entry: &ConfigEntry<R>) -> Location {
    let home = home_location(config);
    if entry.get_bool(CONF_TRACK_HOME, false) {
        return home;
    }

    Location {
        latitude: entry.get_f64(CONF_LATITUDE).unwrap_or(home.latitude),
        longitude: entry.get_f64(CONF_LONGITUDE).unwrap_or(home.longitude),
        elevation: entry
            .get_f64(CONF_ELEVATION)
            .map(|elevation| elevation.round() as i32)
            .unwrap_or(home.elevation),
    }
}

/// 55 to 65 minutes, so entries created together do not poll together
fn random_update_interval() -> Duration {
    let minutes = rand::thread_rng().gen_range(55..65);
    Duration::from_secs(minutes * 60)
}

pub struct MetDataUpdateCoordinator {
    hass: Arc<HomeAssistant>,
    inner: Arc<DataUpdateCoordinator<MetWeatherUpdater>>,
    track_home_listener: Mutex<Option<ListenerHandle>>,
}

impl MetDataUpdateCoordinator {
    pub fn new<R>(
        hass: Arc<HomeAssistant>,
        entry: &ConfigEntry<R>,
        api: Arc<dyn MetWeatherApi>,
    ) -> Self {
        let location = entry_location(&hass.config(), entry);
        let updater = MetWeatherUpdater {
            api,
            location: RwLock::new(location),
        };

        Self {
            hass,
            inner: DataUpdateCoordinator::new(DOMAIN, updater, random_update_interval()),
            track_home_listener: Mutex::new(None),
        }
    }

    /// The generic coordinator entities follow
    pub fn coordinator(&self) -> &Arc<DataUpdateCoordinator<MetWeatherUpdater>> {
        &self.inner
    }

    pub fn data(&self) -> Option<Arc<MetWeatherData>> {
        self.inner.data()
    }

    pub fn location(&self) -> Location {
        self.inner.method().location()
    }

    pub fn last_update_success(&self) -> bool {
        self.inner.last_update_success()
    }

    pub async fn config_entry_first_refresh(&self) -> Result<(), ConfigEntryError> {
        self.inner.config_entry_first_refresh().await
    }

    pub async fn request_refresh(&self) {
        self.inner.request_refresh().await
    }

    fn lock_listener(&self) -> std::sync::MutexGuard<'_, Option<ListenerHandle>> {
        match self.track_home_listener.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Follow the home location: move and refresh whenever the core
    /// configuration changes. Calling it again while tracking does nothing.
    pub fn track_home(&self) {
        let mut listener = self.lock_listener();
        if listener.is_some() {
            return;
        }

        let coordinator = Arc::downgrade(&self.inner);
        let hass = Arc::downgrade(&self.hass);
        let handle = self.hass.bus.listen(CORE_CONFIG_UPDATE, move |event: Event| {
            let coordinator = coordinator.clone();
            let hass = hass.clone();
            async move {
                let (Some(coordinator), Some(hass)) = (coordinator.upgrade(), hass.upgrade()) else {
                    return;
                };

                let mut location = home_location(&hass.config());
                match serde_json::from_value::<CoreConfigUpdateData>(event.data) {
                    Ok(update) => {
                        location.latitude = update.latitude.unwrap_or(location.latitude);
                        location.longitude = update.longitude.unwrap_or(location.longitude);
                        location.elevation = update.elevation.unwrap_or(location.elevation);
                    }
                    Err(err) => warn!(%err, "Ignoring malformed core config update"),
                }

                info!(
                    latitude = location.latitude,
                    longitude = location.longitude,
                    "Home location changed, refreshing weather"
                );
                coordinator.method().set_location(location);
                coordinator.request_refresh().await;
            }
        });

        *listener = Some(handle);
        debug!("Tracking home location");
    }

    /// Stop following the home location. Safe to call when not tracking.
    pub fn untrack_home(&self) {
        if let Some(handle) = self.lock_listener().take() {
            handle.remove();
            debug!("Stopped tracking home location");
        }
    }

    pub fn is_tracking_home(&self) -> bool {
        self.lock_listener().is_some()
    }

    /// Stop polling and tracking
    pub fn shutdown(&self) {
        self.untrack_home();
        self.inner.shutdown();
    }
}

impl Drop for MetDataUpdateCoordinator {
    fn drop(&mut self) {
        self.untrack_home();
    }
}
