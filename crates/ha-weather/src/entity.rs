//! Weather entity
//!
//! Wraps a [`WeatherSource`] and presents its readings as an entity state in
//! the host's unit system.

use ha_config::UnitSystem;
use ha_core::{Context, EntityId, EntityIdError, State, STATE_UNAVAILABLE, STATE_UNKNOWN};
use ha_hass::HomeAssistant;
use ha_update_coordinator::{DataUpdateCoordinator, UpdateMethod};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::consts::*;
use crate::source::{Forecast, WeatherSource};
use crate::units::{round_to, PrecipitationUnit, PressureUnit, SpeedUnit, TemperatureUnit};

type Detach = Box<dyn FnOnce() + Send>;

pub struct WeatherEntity {
    hass: Arc<HomeAssistant>,
    entity_id: EntityId,
    source: Arc<dyn WeatherSource>,
    available: AtomicBool,
    detach: Mutex<Option<Detach>>,
}

impl WeatherEntity {
    /// Entity id is `weather.<slugified name>`
    pub fn new(
        hass: Arc<HomeAssistant>,
        source: Arc<dyn WeatherSource>,
    ) -> Result<Self, EntityIdError> {
        let name = source.name().unwrap_or_else(|| DOMAIN.to_string());
        let entity_id = EntityId::from_name(DOMAIN, &name)?;

        Ok(Self {
            hass,
            entity_id,
            source,
            available: AtomicBool::new(true),
            detach: Mutex::new(None),
        })
    }

    pub(crate) fn set_entity_id(&mut self, entity_id: EntityId) {
        self.entity_id = entity_id;
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    pub fn source(&self) -> &Arc<dyn WeatherSource> {
        &self.source
    }

    pub fn name(&self) -> Option<String> {
        self.source.name()
    }

    pub fn unique_id(&self) -> Option<String> {
        self.source.unique_id()
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Condition when it is a known one, `unknown` otherwise
    pub fn state(&self) -> String {
        if !self.is_available() {
            return STATE_UNAVAILABLE.to_string();
        }
        self.source
            .condition()
            .filter(|condition| is_valid_condition(condition))
            .unwrap_or_else(|| STATE_UNKNOWN.to_string())
    }

    fn unit_system(&self) -> UnitSystem {
        self.hass.config().unit_system
    }

    pub fn temperature(&self) -> Option<f64> {
        let system = self.unit_system();
        self.source
            .native_temperature()
            .map(|value| self.convert_temperature(value, system))
    }

    fn convert_temperature(&self, value: f64, system: UnitSystem) -> f64 {
        let to = TemperatureUnit::for_system(system);
        round_to(self.source.native_temperature_unit().convert(value, to), 1)
    }

    fn convert_pressure(&self, value: f64, system: UnitSystem) -> f64 {
        let to = PressureUnit::for_system(system);
        round_to(self.source.native_pressure_unit().convert(value, to), 2)
    }

    fn convert_speed(&self, value: f64, system: UnitSystem) -> f64 {
        let to = SpeedUnit::for_system(system);
        round_to(self.source.native_wind_speed_unit().convert(value, to), 2)
    }

    fn convert_precipitation(&self, value: f64, system: UnitSystem) -> f64 {
        let to = PrecipitationUnit::for_system(system);
        round_to(self.source.native_precipitation_unit().convert(value, to), 2)
    }

    /// State attributes in the host's unit system
    pub fn state_attributes(&self) -> HashMap<String, Value> {
        let system = self.unit_system();
        let source = &self.source;
        let mut attributes = HashMap::new();

        let mut put = |key: &str, value: Option<f64>| {
            if let Some(value) = value {
                attributes.insert(key.to_string(), json!(value));
            }
        };

        put(
            ATTR_WEATHER_TEMPERATURE,
            source.native_temperature().map(|v| self.convert_temperature(v, system)),
        );
        put(
            ATTR_WEATHER_DEW_POINT,
            source.native_dew_point().map(|v| self.convert_temperature(v, system)),
        );
        put(ATTR_WEATHER_HUMIDITY, source.native_humidity().map(f64::round));
        put(
            ATTR_WEATHER_PRESSURE,
            source.native_pressure().map(|v| self.convert_pressure(v, system)),
        );
        put(
            ATTR_WEATHER_WIND_SPEED,
            source.native_wind_speed().map(|v| self.convert_speed(v, system)),
        );
        put(
            ATTR_WEATHER_WIND_GUST_SPEED,
            source.native_wind_gust_speed().map(|v| self.convert_speed(v, system)),
        );
        put(ATTR_WEATHER_WIND_BEARING, source.wind_bearing());
        put(ATTR_WEATHER_CLOUD_COVERAGE, source.cloud_coverage());

        attributes.insert(
            ATTR_WEATHER_TEMPERATURE_UNIT.to_string(),
            json!(TemperatureUnit::for_system(system).symbol()),
        );
        attributes.insert(
            ATTR_WEATHER_PRESSURE_UNIT.to_string(),
            json!(PressureUnit::for_system(system).symbol()),
        );
        attributes.insert(
            ATTR_WEATHER_WIND_SPEED_UNIT.to_string(),
            json!(SpeedUnit::for_system(system).symbol()),
        );
        attributes.insert(
            ATTR_WEATHER_PRECIPITATION_UNIT.to_string(),
            json!(PrecipitationUnit::for_system(system).symbol()),
        );

        if let Some(attribution) = source.attribution() {
            attributes.insert(ATTR_ATTRIBUTION.to_string(), json!(attribution));
        }
        if let Some(name) = source.name() {
            attributes.insert(ATTR_FRIENDLY_NAME.to_string(), json!(name));
        }

        attributes
    }

    pub fn forecast_daily(&self) -> Option<Vec<Forecast>> {
        let system = self.unit_system();
        self.source
            .forecast_daily()
            .map(|items| items.iter().map(|item| self.convert_forecast(item, system)).collect())
    }

    pub fn forecast_hourly(&self) -> Option<Vec<Forecast>> {
        let system = self.unit_system();
        self.source
            .forecast_hourly()
            .map(|items| items.iter().map(|item| self.convert_forecast(item, system)).collect())
    }

    /// Replace `native_*` keys with converted values under the plain key
    fn convert_forecast(&self, item: &Forecast, system: UnitSystem) -> Forecast {
        let mut converted = Forecast::with_capacity(item.len());

        for (key, value) in item {
            let (key, convert): (&str, Option<fn(&Self, f64, UnitSystem) -> f64>) =
                match key.as_str() {
                    ATTR_FORECAST_NATIVE_TEMP => (ATTR_FORECAST_TEMP, Some(Self::convert_temperature)),
                    ATTR_FORECAST_NATIVE_TEMP_LOW => {
                        (ATTR_FORECAST_TEMP_LOW, Some(Self::convert_temperature))
                    }
                    ATTR_FORECAST_NATIVE_DEW_POINT => {
                        (ATTR_FORECAST_DEW_POINT, Some(Self::convert_temperature))
                    }
                    ATTR_FORECAST_NATIVE_PRESSURE => {
                        (ATTR_FORECAST_PRESSURE, Some(Self::convert_pressure))
                    }
                    ATTR_FORECAST_NATIVE_PRECIPITATION => {
                        (ATTR_FORECAST_PRECIPITATION, Some(Self::convert_precipitation))
                    }
                    ATTR_FORECAST_NATIVE_WIND_SPEED => {
                        (ATTR_FORECAST_WIND_SPEED, Some(Self::convert_speed))
                    }
                    ATTR_FORECAST_NATIVE_WIND_GUST_SPEED => {
                        (ATTR_FORECAST_WIND_GUST_SPEED, Some(Self::convert_speed))
                    }
                    other => (other, None),
                };

            let value = match (convert, value.as_f64()) {
                (Some(convert), Some(number)) => json!(convert(self, number, system)),
                _ => value.clone(),
            };
            converted.insert(key.to_string(), value);
        }

        converted
    }

    /// Write the current state to the state store
    pub fn write_state(&self) -> State {
        let state = self.state();
        debug!(entity_id = %self.entity_id, %state, "Writing weather state");
        self.hass.states.set(
            self.entity_id.clone(),
            state,
            self.state_attributes(),
            Context::new(),
        )
    }

    /// Re-write the state after every refresh of `coordinator`, marking the
    /// entity unavailable while refreshes fail. Stops on [`remove`](Self::remove).
    pub fn follow<U: UpdateMethod>(self: &Arc<Self>, coordinator: &Arc<DataUpdateCoordinator<U>>) {
        let entity = Arc::downgrade(self);
        let weak_coordinator = Arc::downgrade(coordinator);
        let id = coordinator.add_listener(move || {
            let (Some(entity), Some(coordinator)) = (entity.upgrade(), weak_coordinator.upgrade())
            else {
                return;
            };
            entity
                .available
                .store(coordinator.last_update_success(), Ordering::SeqCst);
            entity.write_state();
        });

        let coordinator = coordinator.clone();
        let previous = self
            .lock_detach()
            .replace(Box::new(move || coordinator.remove_listener(id)));
        if let Some(previous) = previous {
            previous();
        }
    }

    fn lock_detach(&self) -> std::sync::MutexGuard<'_, Option<Detach>> {
        match self.detach.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Stop following updates and drop the entity's state
    pub fn remove(&self) -> Option<State> {
        let detach = self.lock_detach().take();
        if let Some(detach) = detach {
            detach();
        }
        self.hass.states.remove(&self.entity_id, Context::new())
    }
}

impl std::fmt::Debug for WeatherEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherEntity")
            .field("entity_id", &self.entity_id)
            .field("available", &self.is_available())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ha_config::CoreConfig;

    struct Fixed {
        condition: Option<&'static str>,
        forecast: Vec<Forecast>,
    }

    impl WeatherSource for Fixed {
        fn name(&self) -> Option<String> {
            Some("Back Yard".to_string())
        }

        fn condition(&self) -> Option<String> {
            self.condition.map(str::to_string)
        }

        fn native_temperature(&self) -> Option<f64> {
            Some(20.0)
        }

        fn native_pressure(&self) -> Option<f64> {
            Some(1013.25)
        }

        fn native_wind_speed(&self) -> Option<f64> {
            Some(5.0)
        }

        fn native_wind_speed_unit(&self) -> SpeedUnit {
            SpeedUnit::MetersPerSecond
        }

        fn wind_bearing(&self) -> Option<f64> {
            Some(270.0)
        }

        fn forecast_daily(&self) -> Option<Vec<Forecast>> {
            Some(self.forecast.clone())
        }
    }

    fn fixed(condition: Option<&'static str>) -> Arc<dyn WeatherSource> {
        let mut item = Forecast::new();
        item.insert(ATTR_FORECAST_TIME.into(), json!("2026-10-18T12:00:00+00:00"));
        item.insert(ATTR_FORECAST_NATIVE_TEMP.into(), json!(10.0));
        item.insert(ATTR_FORECAST_NATIVE_PRECIPITATION.into(), json!(12.7));
        item.insert(ATTR_FORECAST_CONDITION.into(), json!("rainy"));
        Arc::new(Fixed {
            condition,
            forecast: vec![item],
        })
    }

    fn hass(unit_system: UnitSystem) -> Arc<HomeAssistant> {
        Arc::new(HomeAssistant::new(CoreConfig {
            unit_system,
            ..Default::default()
        }))
    }

    #[test]
    fn test_entity_id_from_name() {
        let entity = WeatherEntity::new(hass(UnitSystem::Metric), fixed(Some("sunny"))).unwrap();
        assert_eq!(entity.entity_id().to_string(), "weather.back_yard");
    }

    #[test]
    fn test_state_is_condition_or_unknown() {
        let entity = WeatherEntity::new(hass(UnitSystem::Metric), fixed(Some("sunny"))).unwrap();
        assert_eq!(entity.state(), "sunny");

        let entity = WeatherEntity::new(hass(UnitSystem::Metric), fixed(Some("clearsky"))).unwrap();
        assert_eq!(entity.state(), STATE_UNKNOWN);

        let entity = WeatherEntity::new(hass(UnitSystem::Metric), fixed(None)).unwrap();
        assert_eq!(entity.state(), STATE_UNKNOWN);
    }

    #[test]
    fn test_metric_attributes() {
        let entity = WeatherEntity::new(hass(UnitSystem::Metric), fixed(Some("sunny"))).unwrap();
        let attributes = entity.state_attributes();

        assert_eq!(attributes[ATTR_WEATHER_TEMPERATURE], json!(20.0));
        assert_eq!(attributes[ATTR_WEATHER_TEMPERATURE_UNIT], json!("°C"));
        assert_eq!(attributes[ATTR_WEATHER_PRESSURE], json!(1013.25));
        assert_eq!(attributes[ATTR_WEATHER_WIND_SPEED], json!(18.0));
        assert_eq!(attributes[ATTR_WEATHER_WIND_BEARING], json!(270.0));
        assert_eq!(attributes[ATTR_FRIENDLY_NAME], json!("Back Yard"));
        assert!(!attributes.contains_key(ATTR_WEATHER_HUMIDITY));
    }

    #[test]
    fn test_imperial_attributes() {
        let entity = WeatherEntity::new(hass(UnitSystem::Imperial), fixed(Some("sunny"))).unwrap();
        let attributes = entity.state_attributes();

        assert_eq!(attributes[ATTR_WEATHER_TEMPERATURE], json!(68.0));
        assert_eq!(attributes[ATTR_WEATHER_TEMPERATURE_UNIT], json!("°F"));
        assert_eq!(attributes[ATTR_WEATHER_PRESSURE], json!(29.92));
        assert_eq!(attributes[ATTR_WEATHER_WIND_SPEED], json!(11.18));
        assert_eq!(attributes[ATTR_WEATHER_WIND_SPEED_UNIT], json!("mph"));
    }

    #[test]
    fn test_forecast_converted_to_host_keys() {
        let entity = WeatherEntity::new(hass(UnitSystem::Imperial), fixed(Some("sunny"))).unwrap();
        let forecast = entity.forecast_daily().unwrap();

        assert_eq!(forecast.len(), 1);
        let item = &forecast[0];
        assert_eq!(item[ATTR_FORECAST_TEMP], json!(50.0));
        assert_eq!(item[ATTR_FORECAST_PRECIPITATION], json!(0.5));
        assert_eq!(item[ATTR_FORECAST_CONDITION], json!("rainy"));
        assert!(!item.contains_key(ATTR_FORECAST_NATIVE_TEMP));
        assert!(entity.forecast_hourly().is_none());
    }

    #[derive(Debug)]
    struct Feed {
        temperature: Mutex<Option<f64>>,
    }

    #[async_trait::async_trait]
    impl UpdateMethod for Feed {
        type Data = f64;

        async fn update(&self) -> ha_update_coordinator::UpdateResult<f64> {
            let reading = *self.temperature.lock().unwrap();
            reading.ok_or_else(|| ha_update_coordinator::UpdateError::Failed("offline".into()))
        }
    }

    struct FeedSource(Arc<DataUpdateCoordinator<Feed>>);

    impl WeatherSource for FeedSource {
        fn name(&self) -> Option<String> {
            Some("Feed".to_string())
        }

        fn condition(&self) -> Option<String> {
            Some("sunny".to_string())
        }

        fn native_temperature(&self) -> Option<f64> {
            self.0.data().map(|reading| *reading)
        }
    }

    #[tokio::test]
    async fn test_follow_coordinator() {
        let hass = hass(UnitSystem::Metric);
        let coordinator = DataUpdateCoordinator::new(
            "feed",
            Feed {
                temperature: Mutex::new(Some(12.0)),
            },
            std::time::Duration::from_secs(3600),
        );
        coordinator.refresh().await.unwrap();

        let entity = Arc::new(
            WeatherEntity::new(hass.clone(), Arc::new(FeedSource(coordinator.clone()))).unwrap(),
        );
        entity.follow(&coordinator);
        assert_eq!(coordinator.listener_count(), 1);

        *coordinator.method().temperature.lock().unwrap() = Some(14.5);
        coordinator.refresh().await.unwrap();
        let state = hass.states.get("weather.feed").unwrap();
        assert_eq!(state.state, "sunny");
        assert_eq!(state.attributes[ATTR_WEATHER_TEMPERATURE], json!(14.5));

        *coordinator.method().temperature.lock().unwrap() = None;
        assert!(coordinator.refresh().await.is_err());
        assert_eq!(
            hass.states.get_state("weather.feed").as_deref(),
            Some(STATE_UNAVAILABLE)
        );

        entity.remove();
        assert_eq!(coordinator.listener_count(), 0);
    }

    #[test]
    fn test_write_and_remove_state() {
        let hass = hass(UnitSystem::Metric);
        let entity = WeatherEntity::new(hass.clone(), fixed(Some("rainy"))).unwrap();

        let state = entity.write_state();
        assert_eq!(state.state, "rainy");
        assert_eq!(
            hass.states.get_state("weather.back_yard").as_deref(),
            Some("rainy")
        );

        entity.remove();
        assert!(hass.states.get("weather.back_yard").is_none());
    }
}
