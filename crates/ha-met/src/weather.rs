//! Met.no weather entity

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ha_config_entries::{ConfigEntries, ConfigEntry, ConfigEntryError, PlatformHandler};
use ha_core::sun;
use ha_weather::{
    Forecast, SpeedUnit, WeatherEntity, WeatherPlatform, WeatherSource,
    ATTR_CONDITION_CLEAR_NIGHT, ATTR_CONDITION_SUNNY, ATTR_FORECAST_CONDITION,
    ATTR_WEATHER_CLOUD_COVERAGE, ATTR_WEATHER_DEW_POINT, ATTR_WEATHER_HUMIDITY,
    ATTR_WEATHER_PRESSURE, ATTR_WEATHER_TEMPERATURE, ATTR_WEATHER_WIND_BEARING,
    ATTR_WEATHER_WIND_GUST_SPEED, ATTR_WEATHER_WIND_SPEED,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::consts::{
    attr_key, format_condition, ATTRIBUTION, CONDITION_KEY, CONF_NAME, CONF_TRACK_HOME,
    DEFAULT_NAME, FORECAST_MAP, REQUIRED_FORECAST_KEYS,
};
use crate::coordinator::MetDataUpdateCoordinator;

/// Weather of one site, read live from the entry's coordinator
pub struct MetWeather {
    coordinator: Arc<MetDataUpdateCoordinator>,
    name: String,
    latitude: f64,
    longitude: f64,
    is_metric: bool,
}

impl MetWeather {
    pub fn new(
        coordinator: Arc<MetDataUpdateCoordinator>,
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
        is_metric: bool,
    ) -> Self {
        Self {
            coordinator,
            name: name.into(),
            latitude,
            longitude,
            is_metric,
        }
    }

    pub fn location_name(&self) -> &str {
        &self.name
    }

    pub fn is_metric(&self) -> bool {
        self.is_metric
    }

    /// Number stored under the provider key of `attribute`
    fn current(&self, attribute: &str) -> Option<f64> {
        let key = attr_key(attribute)?;
        let data = self.coordinator.data()?;
        data.current_weather_data.get(key)?.as_f64()
    }

    /// Current condition as it reads at `at`; `sunny` turns into
    /// `clear-night` while the sun is down
    pub fn condition_at(&self, at: DateTime<Utc>) -> Option<String> {
        let data = self.coordinator.data()?;
        let code = data.current_weather_data.get(CONDITION_KEY)?.as_str()?;

        let condition = format_condition(code);
        if condition == ATTR_CONDITION_SUNNY && !sun::is_up(self.latitude, self.longitude, at) {
            return Some(ATTR_CONDITION_CLEAR_NIGHT.to_string());
        }
        Some(condition.to_string())
    }

    /// Hourly or daily forecast translated to forecast attributes.
    ///
    /// Items missing the temperature or the time are skipped, every mapped
    /// field present in an item is copied, and the condition is translated.
    pub fn forecast(&self, hourly: bool) -> Option<Vec<Forecast>> {
        let data = self.coordinator.data()?;
        let items = if hourly {
            &data.hourly_forecast
        } else {
            &data.daily_forecast
        };

        Some(items.iter().filter_map(translate_forecast_item).collect())
    }
}

fn translate_forecast_item(item: &Map<String, Value>) -> Option<Forecast> {
    if !REQUIRED_FORECAST_KEYS.iter().all(|key| item.contains_key(*key)) {
        return None;
    }

    let mut forecast = Forecast::new();
    for (attribute, key) in FORECAST_MAP {
        match item.get(*key) {
            Some(Value::Null) | None => {}
            Some(value) => {
                forecast.insert(attribute.to_string(), value.clone());
            }
        }
    }

    if let Some(condition) = forecast.get_mut(ATTR_FORECAST_CONDITION) {
        let code = condition.as_str().unwrap_or_default();
        *condition = Value::from(format_condition(code));
    }

    Some(forecast)
}

impl WeatherSource for MetWeather {
    fn name(&self) -> Option<String> {
        Some(self.name.clone())
    }

    fn unique_id(&self) -> Option<String> {
        Some(format!("{}_{}", self.latitude, self.longitude))
    }

    fn condition(&self) -> Option<String> {
        self.condition_at(Utc::now())
    }

    fn native_temperature(&self) -> Option<f64> {
        self.current(ATTR_WEATHER_TEMPERATURE)
    }

    fn native_humidity(&self) -> Option<f64> {
        self.current(ATTR_WEATHER_HUMIDITY)
    }

    fn native_pressure(&self) -> Option<f64> {
        self.current(ATTR_WEATHER_PRESSURE)
    }

    fn native_wind_speed(&self) -> Option<f64> {
        self.current(ATTR_WEATHER_WIND_SPEED)
    }

    fn wind_bearing(&self) -> Option<f64> {
        self.current(ATTR_WEATHER_WIND_BEARING)
    }

    fn native_wind_gust_speed(&self) -> Option<f64> {
        self.current(ATTR_WEATHER_WIND_GUST_SPEED)
    }

    fn native_dew_point(&self) -> Option<f64> {
        self.current(ATTR_WEATHER_DEW_POINT)
    }

    fn cloud_coverage(&self) -> Option<f64> {
        self.current(ATTR_WEATHER_CLOUD_COVERAGE)
    }

    fn forecast_daily(&self) -> Option<Vec<Forecast>> {
        self.forecast(false)
    }

    fn forecast_hourly(&self) -> Option<Vec<Forecast>> {
        self.forecast(true)
    }

    // met.no reports wind in m/s
    fn native_wind_speed_unit(&self) -> SpeedUnit {
        SpeedUnit::MetersPerSecond
    }

    fn attribution(&self) -> Option<String> {
        Some(ATTRIBUTION.to_string())
    }
}

/// Weather platform of the met integration
pub struct MetWeatherPlatform {
    platform: WeatherPlatform,
}

impl MetWeatherPlatform {
    pub fn new(platform: WeatherPlatform) -> Self {
        Self { platform }
    }

    pub fn platform(&self) -> &WeatherPlatform {
        &self.platform
    }
}

#[async_trait]
impl PlatformHandler<MetDataUpdateCoordinator> for MetWeatherPlatform {
    async fn setup_entry(
        &self,
        entries: &Arc<ConfigEntries<MetDataUpdateCoordinator>>,
        entry: &ConfigEntry<MetDataUpdateCoordinator>,
    ) -> Result<(), ConfigEntryError> {
        let Some(coordinator) = entry.runtime_data.clone() else {
            debug!(entry_id = %entry.entry_id, "No coordinator, adding no weather entity");
            return Ok(());
        };

        let hass = entries.hass().clone();
        let config = hass.config();
        let name = if entry.get_bool(CONF_TRACK_HOME, false) {
            config.location_name.clone()
        } else {
            entry.get_str(CONF_NAME).unwrap_or(DEFAULT_NAME).to_string()
        };

        let source = MetWeather::new(
            coordinator.clone(),
            name,
            config.latitude,
            config.longitude,
            config.is_metric(),
        );
        let entity = WeatherEntity::new(hass, Arc::new(source))
            .map_err(|err| ConfigEntryError::Error(err.to_string()))?;

        for entity in self.platform.add_entities(&entry.entry_id, vec![entity]) {
            entity.follow(coordinator.coordinator());
        }
        Ok(())
    }

    async fn unload_entry(
        &self,
        _entries: &Arc<ConfigEntries<MetDataUpdateCoordinator>>,
        entry: &ConfigEntry<MetDataUpdateCoordinator>,
    ) -> bool {
        self.platform.remove_entry(&entry.entry_id);
        true
    }
}
