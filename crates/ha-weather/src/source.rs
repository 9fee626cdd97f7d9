//! The readings a weather integration provides

use indexmap::IndexMap;

use crate::units::{PrecipitationUnit, PressureUnit, SpeedUnit, TemperatureUnit};

/// One forecast item: attribute key to value, in insertion order
pub type Forecast = IndexMap<String, serde_json::Value>;

/// Capability interface of a weather entity.
///
/// Readings are in the source's native units and are read on demand, so an
/// implementation should project its backing data rather than cache it.
/// Everything except the name and condition is optional.
pub trait WeatherSource: Send + Sync {
    fn name(&self) -> Option<String>;

    fn unique_id(&self) -> Option<String> {
        None
    }

    /// Current condition, one of [`CONDITIONS`](crate::CONDITIONS)
    fn condition(&self) -> Option<String>;

    fn native_temperature(&self) -> Option<f64> {
        None
    }

    fn native_humidity(&self) -> Option<f64> {
        None
    }

    fn native_pressure(&self) -> Option<f64> {
        None
    }

    fn native_wind_speed(&self) -> Option<f64> {
        None
    }

    /// Degrees the wind blows from
    fn wind_bearing(&self) -> Option<f64> {
        None
    }

    fn native_wind_gust_speed(&self) -> Option<f64> {
        None
    }

    fn native_dew_point(&self) -> Option<f64> {
        None
    }

    /// Percent of the sky covered
    fn cloud_coverage(&self) -> Option<f64> {
        None
    }

    fn forecast_daily(&self) -> Option<Vec<Forecast>> {
        None
    }

    fn forecast_hourly(&self) -> Option<Vec<Forecast>> {
        None
    }

    fn native_temperature_unit(&self) -> TemperatureUnit {
        TemperatureUnit::Celsius
    }

    fn native_pressure_unit(&self) -> PressureUnit {
        PressureUnit::Hectopascal
    }

    fn native_wind_speed_unit(&self) -> SpeedUnit {
        SpeedUnit::KilometersPerHour
    }

    fn native_precipitation_unit(&self) -> PrecipitationUnit {
        PrecipitationUnit::Millimeters
    }

    fn attribution(&self) -> Option<String> {
        None
    }
}
