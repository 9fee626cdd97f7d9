//! Shared fixtures for met integration tests
//!
//! A [`TestHarness`] wires a host with the met integration registered against
//! an in-memory [`MockMetApi`].

#![allow(dead_code)]

use async_trait::async_trait;
use ha_config::CoreConfig;
use ha_config_entries::{ConfigEntries, ConfigEntry};
use ha_hass::HomeAssistant;
use ha_met::{
    Location, MetApiError, MetDataUpdateCoordinator, MetWeatherApi, MetWeatherData,
    MetWeatherPlatform, DOMAIN,
};
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Latitude and longitude of the test home
pub const HOME: (f64, f64) = (59.9139, 10.7522);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// Provider data with a mix of complete and incomplete forecast items
pub fn weather_data() -> MetWeatherData {
    MetWeatherData {
        current_weather_data: object(json!({
            "condition": "cloudy",
            "air_temperature": 21.5,
            "relative_humidity": 63.0,
            "air_pressure_at_sea_level": 1012.4,
            "wind_speed": 3.5,
            "wind_from_direction": 210.0,
            "wind_speed_of_gust": 7.0,
            "dew_point_temperature": 14.1,
            "cloud_area_fraction": 88.0,
        })),
        hourly_forecast: vec![
            object(json!({
                "datetime": "2026-10-18T12:00:00+00:00",
                "temperature": 21.0,
                "condition": "partlycloudy_day",
                "precipitation": 0.0,
                "wind_speed": 3.1,
            })),
            object(json!({
                "datetime": "2026-10-18T13:00:00+00:00",
                "temperature": 21.4,
                "condition": "lightrainshowers_day",
            })),
            // no temperature
            object(json!({
                "datetime": "2026-10-18T14:00:00+00:00",
                "condition": "rain",
            })),
        ],
        daily_forecast: vec![
            object(json!({
                "datetime": "2026-10-19T00:00:00+00:00",
                "temperature": 17.0,
                "templow": 9.0,
                "condition": "heavyrainshowersandthunder_night",
                "precipitation": 12.5,
            })),
            // no datetime
            object(json!({
                "temperature": 15.0,
                "condition": "clearsky_day",
            })),
            object(json!({
                "datetime": "2026-10-21T00:00:00+00:00",
                "temperature": 14.0,
                "condition": "volcanic_ash",
            })),
        ],
    }
}

/// In-memory weather provider recording every fetch
pub struct MockMetApi {
    response: Mutex<Result<MetWeatherData, MetApiError>>,
    fetches: Mutex<Vec<Location>>,
}

impl MockMetApi {
    pub fn new(data: MetWeatherData) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(Ok(data)),
            fetches: Mutex::new(Vec::new()),
        })
    }

    pub fn respond_with(&self, response: Result<MetWeatherData, MetApiError>) {
        *self.response.lock().unwrap() = response;
    }

    pub fn fetches(&self) -> Vec<Location> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    /// Wait until a fetch for `latitude` has been made
    pub async fn wait_for_fetch_at(&self, latitude: f64) -> bool {
        for _ in 0..100 {
            if self.fetches().iter().any(|l| l.latitude == latitude) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

#[async_trait]
impl MetWeatherApi for MockMetApi {
    async fn fetch(&self, location: Location) -> Result<MetWeatherData, MetApiError> {
        self.fetches.lock().unwrap().push(location);
        self.response.lock().unwrap().clone()
    }
}

pub struct TestHarness {
    pub hass: Arc<HomeAssistant>,
    pub entries: Arc<ConfigEntries<MetDataUpdateCoordinator>>,
    pub platform: Arc<MetWeatherPlatform>,
    pub api: Arc<MockMetApi>,
}

impl TestHarness {
    pub fn new(config: CoreConfig) -> Self {
        init_tracing();

        let hass = Arc::new(HomeAssistant::new(config));
        let entries = ConfigEntries::new(hass.clone());
        let api = MockMetApi::new(weather_data());
        let platform = ha_met::register(&entries, api.clone());

        Self {
            hass,
            entries,
            platform,
            api,
        }
    }

    /// Host with a real home location named "Oslo"
    pub fn with_home() -> Self {
        Self::new(CoreConfig {
            location_name: "Oslo".to_string(),
            latitude: HOME.0,
            longitude: HOME.1,
            elevation: 23,
            ..Default::default()
        })
    }

    /// Add an entry with `data` and return its id
    pub fn add_entry(&self, title: &str, data: Value) -> String {
        let mut entry = ConfigEntry::new(DOMAIN, title);
        for (key, value) in object(data) {
            entry = entry.with_data_value(key, value);
        }
        self.entries.add(entry).unwrap().entry_id
    }

    pub fn entry(&self, entry_id: &str) -> ConfigEntry<MetDataUpdateCoordinator> {
        self.entries.get(entry_id).unwrap()
    }

    pub fn coordinator(&self, entry_id: &str) -> Arc<MetDataUpdateCoordinator> {
        self.entry(entry_id)
            .runtime_data
            .expect("entry has no coordinator")
    }

    pub fn assert_state(&self, entity_id: &str, expected: &str) {
        let state = self.hass.states.get_state(entity_id);
        assert_eq!(
            state.as_deref(),
            Some(expected),
            "Expected entity {} to be in state '{}', but was {:?}",
            entity_id,
            expected,
            state
        );
    }
}
