//! Weather conditions and attribute names

pub const DOMAIN: &str = "weather";

pub const ATTR_CONDITION_CLEAR_NIGHT: &str = "clear-night";
pub const ATTR_CONDITION_CLOUDY: &str = "cloudy";
pub const ATTR_CONDITION_EXCEPTIONAL: &str = "exceptional";
pub const ATTR_CONDITION_FOG: &str = "fog";
pub const ATTR_CONDITION_HAIL: &str = "hail";
pub const ATTR_CONDITION_LIGHTNING: &str = "lightning";
pub const ATTR_CONDITION_LIGHTNING_RAINY: &str = "lightning-rainy";
pub const ATTR_CONDITION_PARTLYCLOUDY: &str = "partlycloudy";
pub const ATTR_CONDITION_POURING: &str = "pouring";
pub const ATTR_CONDITION_RAINY: &str = "rainy";
pub const ATTR_CONDITION_SNOWY: &str = "snowy";
pub const ATTR_CONDITION_SNOWY_RAINY: &str = "snowy-rainy";
pub const ATTR_CONDITION_SUNNY: &str = "sunny";
pub const ATTR_CONDITION_WINDY: &str = "windy";
pub const ATTR_CONDITION_WINDY_VARIANT: &str = "windy-variant";

/// Every condition a weather entity may report
pub const CONDITIONS: [&str; 15] = [
    ATTR_CONDITION_CLEAR_NIGHT,
    ATTR_CONDITION_CLOUDY,
    ATTR_CONDITION_EXCEPTIONAL,
    ATTR_CONDITION_FOG,
    ATTR_CONDITION_HAIL,
    ATTR_CONDITION_LIGHTNING,
    ATTR_CONDITION_LIGHTNING_RAINY,
    ATTR_CONDITION_PARTLYCLOUDY,
    ATTR_CONDITION_POURING,
    ATTR_CONDITION_RAINY,
    ATTR_CONDITION_SNOWY,
    ATTR_CONDITION_SNOWY_RAINY,
    ATTR_CONDITION_SUNNY,
    ATTR_CONDITION_WINDY,
    ATTR_CONDITION_WINDY_VARIANT,
];

pub fn is_valid_condition(condition: &str) -> bool {
    CONDITIONS.iter().any(|c| *c == condition)
}

// Entity state attributes
pub const ATTR_WEATHER_TEMPERATURE: &str = "temperature";
pub const ATTR_WEATHER_TEMPERATURE_UNIT: &str = "temperature_unit";
pub const ATTR_WEATHER_HUMIDITY: &str = "humidity";
pub const ATTR_WEATHER_PRESSURE: &str = "pressure";
pub const ATTR_WEATHER_PRESSURE_UNIT: &str = "pressure_unit";
pub const ATTR_WEATHER_WIND_SPEED: &str = "wind_speed";
pub const ATTR_WEATHER_WIND_SPEED_UNIT: &str = "wind_speed_unit";
pub const ATTR_WEATHER_WIND_BEARING: &str = "wind_bearing";
pub const ATTR_WEATHER_WIND_GUST_SPEED: &str = "wind_gust_speed";
pub const ATTR_WEATHER_DEW_POINT: &str = "dew_point";
pub const ATTR_WEATHER_CLOUD_COVERAGE: &str = "cloud_coverage";
pub const ATTR_WEATHER_PRECIPITATION_UNIT: &str = "precipitation_unit";
pub const ATTR_ATTRIBUTION: &str = "attribution";
pub const ATTR_FRIENDLY_NAME: &str = "friendly_name";

// Forecast item keys. `native_*` values are in the source's units and are
// converted to the plain key when presented.
pub const ATTR_FORECAST_CONDITION: &str = "condition";
pub const ATTR_FORECAST_TIME: &str = "datetime";
pub const ATTR_FORECAST_NATIVE_TEMP: &str = "native_temperature";
pub const ATTR_FORECAST_NATIVE_TEMP_LOW: &str = "native_templow";
pub const ATTR_FORECAST_NATIVE_PRECIPITATION: &str = "native_precipitation";
pub const ATTR_FORECAST_PRECIPITATION_PROBABILITY: &str = "precipitation_probability";
pub const ATTR_FORECAST_NATIVE_PRESSURE: &str = "native_pressure";
pub const ATTR_FORECAST_NATIVE_DEW_POINT: &str = "native_dew_point";
pub const ATTR_FORECAST_NATIVE_WIND_SPEED: &str = "native_wind_speed";
pub const ATTR_FORECAST_NATIVE_WIND_GUST_SPEED: &str = "native_wind_gust_speed";
pub const ATTR_FORECAST_WIND_BEARING: &str = "wind_bearing";
pub const ATTR_FORECAST_HUMIDITY: &str = "humidity";
pub const ATTR_FORECAST_CLOUD_COVERAGE: &str = "cloud_coverage";
pub const ATTR_FORECAST_UV_INDEX: &str = "uv_index";

pub const ATTR_FORECAST_TEMP: &str = "temperature";
pub const ATTR_FORECAST_TEMP_LOW: &str = "templow";
pub const ATTR_FORECAST_PRECIPITATION: &str = "precipitation";
pub const ATTR_FORECAST_PRESSURE: &str = "pressure";
pub const ATTR_FORECAST_DEW_POINT: &str = "dew_point";
pub const ATTR_FORECAST_WIND_SPEED: &str = "wind_speed";
pub const ATTR_FORECAST_WIND_GUST_SPEED: &str = "wind_gust_speed";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_conditions() {
        assert!(is_valid_condition("sunny"));
        assert!(is_valid_condition("clear-night"));
        assert!(!is_valid_condition("clearsky_day"));
        assert!(!is_valid_condition("Sunny"));
    }
}
