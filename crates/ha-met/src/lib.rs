//! Met.no weather integration
//!
//! One config entry per site. Setup fetches the first forecast through a
//! [`MetDataUpdateCoordinator`], optionally follows the home location, and
//! forwards to the weather platform, which adds a single [`MetWeather`]
//! entity reading live from that coordinator.
//!
//! Entry data keys: `track_home` (bool), `name`, and for fixed sites
//! `latitude`, `longitude` and `elevation`.

pub mod api;
pub mod consts;
pub mod coordinator;
pub mod setup;
pub mod weather;

use ha_config_entries::ConfigEntries;
use ha_core::Platform;
use ha_weather::WeatherPlatform;
use std::sync::Arc;

pub use api::{Location, MetApiError, MetWeatherApi, MetWeatherData};
pub use consts::DOMAIN;
pub use coordinator::{MetDataUpdateCoordinator, MetWeatherUpdater};
pub use setup::MetIntegration;
pub use weather::{MetWeather, MetWeatherPlatform};

/// Register the integration and its weather platform with the config entry
/// manager. Returns the platform so callers can look up its entities.
pub fn register(
    entries: &Arc<ConfigEntries<MetDataUpdateCoordinator>>,
    api: Arc<dyn MetWeatherApi>,
) -> Arc<MetWeatherPlatform> {
    let platform = Arc::new(MetWeatherPlatform::new(WeatherPlatform::new(
        entries.hass().clone(),
    )));

    entries.register_integration(DOMAIN, Arc::new(MetIntegration::new(api)));
    entries.register_platform(DOMAIN, Platform::Weather, platform.clone());

    platform
}
