//! Units weather readings are reported in

use ha_config::UnitSystem;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureUnit {
    #[serde(rename = "°C")]
    Celsius,
    #[serde(rename = "°F")]
    Fahrenheit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PressureUnit {
    #[serde(rename = "hPa")]
    Hectopascal,
    #[serde(rename = "inHg")]
    InchesOfMercury,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedUnit {
    #[serde(rename = "m/s")]
    MetersPerSecond,
    #[serde(rename = "km/h")]
    KilometersPerHour,
    #[serde(rename = "mph")]
    MilesPerHour,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrecipitationUnit {
    #[serde(rename = "mm")]
    Millimeters,
    #[serde(rename = "in")]
    Inches,
}

const HPA_PER_INHG: f64 = 33.863_886_666_667;
const KMH_PER_MPH: f64 = 1.609_344;
const MM_PER_INCH: f64 = 25.4;

impl TemperatureUnit {
    pub fn symbol(self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }

    pub fn for_system(system: UnitSystem) -> Self {
        match system {
            UnitSystem::Metric => TemperatureUnit::Celsius,
            UnitSystem::Imperial => TemperatureUnit::Fahrenheit,
        }
    }

    pub fn convert(self, value: f64, to: Self) -> f64 {
        match (self, to) {
            (TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit) => value * 9.0 / 5.0 + 32.0,
            (TemperatureUnit::Fahrenheit, TemperatureUnit::Celsius) => (value - 32.0) * 5.0 / 9.0,
            _ => value,
        }
    }
}

impl PressureUnit {
    pub fn symbol(self) -> &'static str {
        match self {
            PressureUnit::Hectopascal => "hPa",
            PressureUnit::InchesOfMercury => "inHg",
        }
    }

    pub fn for_system(system: UnitSystem) -> Self {
        match system {
            UnitSystem::Metric => PressureUnit::Hectopascal,
            UnitSystem::Imperial => PressureUnit::InchesOfMercury,
        }
    }

    pub fn convert(self, value: f64, to: Self) -> f64 {
        match (self, to) {
            (PressureUnit::Hectopascal, PressureUnit::InchesOfMercury) => value / HPA_PER_INHG,
            (PressureUnit::InchesOfMercury, PressureUnit::Hectopascal) => value * HPA_PER_INHG,
            _ => value,
        }
    }
}

impl SpeedUnit {
    pub fn symbol(self) -> &'static str {
        match self {
            SpeedUnit::MetersPerSecond => "m/s",
            SpeedUnit::KilometersPerHour => "km/h",
            SpeedUnit::MilesPerHour => "mph",
        }
    }

    pub fn for_system(system: UnitSystem) -> Self {
        match system {
            UnitSystem::Metric => SpeedUnit::KilometersPerHour,
            UnitSystem::Imperial => SpeedUnit::MilesPerHour,
        }
    }

    fn to_kmh(self, value: f64) -> f64 {
        match self {
            SpeedUnit::MetersPerSecond => value * 3.6,
            SpeedUnit::KilometersPerHour => value,
            SpeedUnit::MilesPerHour => value * KMH_PER_MPH,
        }
    }

    pub fn convert(self, value: f64, to: Self) -> f64 {
        let kmh = self.to_kmh(value);
        match to {
            SpeedUnit::MetersPerSecond => kmh / 3.6,
            SpeedUnit::KilometersPerHour => kmh,
            SpeedUnit::MilesPerHour => kmh / KMH_PER_MPH,
        }
    }
}

impl PrecipitationUnit {
    pub fn symbol(self) -> &'static str {
        match self {
            PrecipitationUnit::Millimeters => "mm",
            PrecipitationUnit::Inches => "in",
        }
    }

    pub fn for_system(system: UnitSystem) -> Self {
        match system {
            UnitSystem::Metric => PrecipitationUnit::Millimeters,
            UnitSystem::Imperial => PrecipitationUnit::Inches,
        }
    }

    pub fn convert(self, value: f64, to: Self) -> f64 {
        match (self, to) {
            (PrecipitationUnit::Millimeters, PrecipitationUnit::Inches) => value / MM_PER_INCH,
            (PrecipitationUnit::Inches, PrecipitationUnit::Millimeters) => value * MM_PER_INCH,
            _ => value,
        }
    }
}

/// Round to `digits` decimal places
pub(crate) fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10_f64.powi(digits);
    (value * factor).round() / factor
}
