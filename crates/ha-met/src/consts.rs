//! Met.no constants and the tables that translate provider data

use ha_core::Platform;
use ha_weather::{
    ATTR_CONDITION_CLEAR_NIGHT, ATTR_CONDITION_CLOUDY, ATTR_CONDITION_EXCEPTIONAL,
    ATTR_CONDITION_FOG, ATTR_CONDITION_LIGHTNING_RAINY, ATTR_CONDITION_PARTLYCLOUDY,
    ATTR_CONDITION_POURING, ATTR_CONDITION_RAINY, ATTR_CONDITION_SNOWY,
    ATTR_CONDITION_SNOWY_RAINY, ATTR_CONDITION_SUNNY, ATTR_FORECAST_CONDITION,
    ATTR_FORECAST_HUMIDITY, ATTR_FORECAST_NATIVE_PRECIPITATION, ATTR_FORECAST_NATIVE_TEMP,
    ATTR_FORECAST_NATIVE_TEMP_LOW, ATTR_FORECAST_NATIVE_WIND_GUST_SPEED,
    ATTR_FORECAST_NATIVE_WIND_SPEED, ATTR_FORECAST_PRECIPITATION_PROBABILITY, ATTR_FORECAST_TIME,
    ATTR_FORECAST_UV_INDEX, ATTR_FORECAST_WIND_BEARING, ATTR_WEATHER_CLOUD_COVERAGE,
    ATTR_WEATHER_DEW_POINT, ATTR_WEATHER_HUMIDITY, ATTR_WEATHER_PRESSURE,
    ATTR_WEATHER_TEMPERATURE, ATTR_WEATHER_WIND_BEARING, ATTR_WEATHER_WIND_GUST_SPEED,
    ATTR_WEATHER_WIND_SPEED, CONDITIONS,
};

pub const DOMAIN: &str = "met";

pub const CONF_TRACK_HOME: &str = "track_home";
pub const CONF_NAME: &str = "name";
pub const CONF_LATITUDE: &str = "latitude";
pub const CONF_LONGITUDE: &str = "longitude";
pub const CONF_ELEVATION: &str = "elevation";

pub const DEFAULT_NAME: &str = "Met.no";

pub const ATTRIBUTION: &str =
    "Weather forecast from met.no, delivered by the Norwegian Meteorological Institute.";

pub const SERVICE_REFRESH: &str = "refresh";

pub const PLATFORMS: [Platform; 1] = [Platform::Weather];

/// Key of the symbol code in current-conditions and forecast data
pub const CONDITION_KEY: &str = "condition";

/// Weather attribute -> key in the provider's current conditions
pub const ATTR_MAP: &[(&str, &str)] = &[
    (ATTR_WEATHER_TEMPERATURE, "air_temperature"),
    (ATTR_WEATHER_HUMIDITY, "relative_humidity"),
    (ATTR_WEATHER_PRESSURE, "air_pressure_at_sea_level"),
    (ATTR_WEATHER_WIND_SPEED, "wind_speed"),
    (ATTR_WEATHER_WIND_BEARING, "wind_from_direction"),
    (ATTR_WEATHER_WIND_GUST_SPEED, "wind_speed_of_gust"),
    (ATTR_WEATHER_DEW_POINT, "dew_point_temperature"),
    (ATTR_WEATHER_CLOUD_COVERAGE, "cloud_area_fraction"),
];

/// Forecast attribute -> key in a provider forecast item
pub const FORECAST_MAP: &[(&str, &str)] = &[
    (ATTR_FORECAST_CONDITION, "condition"),
    (ATTR_FORECAST_NATIVE_PRECIPITATION, "precipitation"),
    (ATTR_FORECAST_PRECIPITATION_PROBABILITY, "precipitation_probability"),
    (ATTR_FORECAST_NATIVE_TEMP, "temperature"),
    (ATTR_FORECAST_NATIVE_TEMP_LOW, "templow"),
    (ATTR_FORECAST_TIME, "datetime"),
    (ATTR_FORECAST_WIND_BEARING, "wind_bearing"),
    (ATTR_FORECAST_NATIVE_WIND_SPEED, "wind_speed"),
    (ATTR_FORECAST_NATIVE_WIND_GUST_SPEED, "wind_gust"),
    (ATTR_FORECAST_HUMIDITY, "humidity"),
    (ATTR_FORECAST_UV_INDEX, "uv_index"),
];

/// Forecast items without these provider keys are dropped
pub const REQUIRED_FORECAST_KEYS: [&str; 2] = ["temperature", "datetime"];

/// Weather condition -> provider symbol codes.
///
/// Codes are listed without their `_day`/`_night`/`_polartwilight` variant
/// suffix, except where the variant changes the condition.
pub const CONDITIONS_MAP: &[(&str, &[&str])] = &[
    (ATTR_CONDITION_CLEAR_NIGHT, &["clearsky_night"]),
    (ATTR_CONDITION_SUNNY, &["clearsky_day", "clearsky_polartwilight", "clearsky"]),
    (ATTR_CONDITION_CLOUDY, &["cloudy"]),
    (ATTR_CONDITION_FOG, &["fog"]),
    (
        ATTR_CONDITION_LIGHTNING_RAINY,
        &[
            "heavyrainandthunder",
            "heavyrainshowersandthunder",
            "heavysleetandthunder",
            "heavysleetshowersandthunder",
            "heavysnowandthunder",
            "heavysnowshowersandthunder",
            "lightrainandthunder",
            "lightrainshowersandthunder",
            "lightsleetandthunder",
            "lightsnowandthunder",
            "lightssleetshowersandthunder",
            "lightssnowshowersandthunder",
            "rainandthunder",
            "rainshowersandthunder",
            "sleetandthunder",
            "sleetshowersandthunder",
            "snowandthunder",
            "snowshowersandthunder",
        ],
    ),
    (ATTR_CONDITION_PARTLYCLOUDY, &["fair", "partlycloudy"]),
    (ATTR_CONDITION_POURING, &["heavyrain", "heavyrainshowers"]),
    (
        ATTR_CONDITION_RAINY,
        &["lightrain", "lightrainshowers", "rain", "rainshowers"],
    ),
    (
        ATTR_CONDITION_SNOWY,
        &[
            "heavysnow",
            "heavysnowshowers",
            "lightsnow",
            "lightsnowshowers",
            "snow",
            "snowshowers",
        ],
    ),
    (
        ATTR_CONDITION_SNOWY_RAINY,
        &[
            "heavysleet",
            "heavysleetshowers",
            "lightsleet",
            "lightsleetshowers",
            "sleet",
            "sleetshowers",
        ],
    ),
];

const VARIANT_SUFFIXES: [&str; 3] = ["_day", "_night", "_polartwilight"];

/// Provider key for a weather attribute
pub fn attr_key(attribute: &str) -> Option<&'static str> {
    ATTR_MAP
        .iter()
        .find(|(attr, _)| *attr == attribute)
        .map(|(_, key)| *key)
}

fn lookup_condition(code: &str) -> Option<&'static str> {
    CONDITIONS_MAP
        .iter()
        .find(|(_, codes)| codes.iter().any(|c| *c == code))
        .map(|(condition, _)| *condition)
}

/// Translate a provider symbol code into a weather condition.
///
/// Conditions pass through unchanged; anything unrecognised becomes
/// `exceptional`.
pub fn format_condition(code: &str) -> &'static str {
    if let Some(condition) = CONDITIONS.iter().copied().find(|c| *c == code) {
        return condition;
    }
    if let Some(condition) = lookup_condition(code) {
        return condition;
    }

    VARIANT_SUFFIXES
        .iter()
        .find_map(|suffix| code.strip_suffix(suffix))
        .and_then(lookup_condition)
        .unwrap_or(ATTR_CONDITION_EXCEPTIONAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ha_weather::{is_valid_condition, ATTR_CONDITION_WINDY_VARIANT};

    #[test]
    fn test_attr_key() {
        assert_eq!(attr_key(ATTR_WEATHER_TEMPERATURE), Some("air_temperature"));
        assert_eq!(attr_key(ATTR_WEATHER_WIND_BEARING), Some("wind_from_direction"));
        assert_eq!(attr_key("visibility"), None);
    }

    #[test]
    fn test_format_condition_variants() {
        assert_eq!(format_condition("clearsky_day"), ATTR_CONDITION_SUNNY);
        assert_eq!(format_condition("clearsky_night"), ATTR_CONDITION_CLEAR_NIGHT);
        assert_eq!(format_condition("fair_night"), ATTR_CONDITION_PARTLYCLOUDY);
        assert_eq!(format_condition("partlycloudy_polartwilight"), ATTR_CONDITION_PARTLYCLOUDY);
        assert_eq!(format_condition("heavyrainshowers_day"), ATTR_CONDITION_POURING);
        assert_eq!(format_condition("lightrain"), ATTR_CONDITION_RAINY);
        assert_eq!(format_condition("sleetshowers_night"), ATTR_CONDITION_SNOWY_RAINY);
        assert_eq!(
            format_condition("rainshowersandthunder_day"),
            ATTR_CONDITION_LIGHTNING_RAINY
        );
    }

    #[test]
    fn test_format_condition_passthrough_and_fallback() {
        assert_eq!(format_condition("sunny"), ATTR_CONDITION_SUNNY);
        assert_eq!(format_condition("windy-variant"), ATTR_CONDITION_WINDY_VARIANT);
        assert_eq!(format_condition("volcanic_ash"), ATTR_CONDITION_EXCEPTIONAL);
        assert_eq!(format_condition(""), ATTR_CONDITION_EXCEPTIONAL);
    }

    #[test]
    fn test_every_mapped_condition_is_valid() {
        for (condition, _) in CONDITIONS_MAP {
            assert!(is_valid_condition(condition), "{condition}");
        }
    }
}
