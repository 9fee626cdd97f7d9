//! Sun position helper
//!
//! NOAA's low-precision solar position equations; accurate to well under a
//! degree, which is plenty to tell day from night.

use chrono::{DateTime, Datelike, Timelike, Utc};
use std::f64::consts::PI;

/// Elevation of the sun's upper limb at sunrise/sunset, including refraction
pub const SUNRISE_ELEVATION: f64 = -0.833;

/// Solar elevation in degrees for a location at the given instant
pub fn elevation(latitude: f64, longitude: f64, at: DateTime<Utc>) -> f64 {
    let hour = at.hour() as f64 + at.minute() as f64 / 60.0 + at.second() as f64 / 3600.0;
    let days_in_year = if is_leap_year(at.year()) { 366.0 } else { 365.0 };
    let gamma = 2.0 * PI / days_in_year * (at.ordinal0() as f64 + (hour - 12.0) / 24.0);

    let eq_time = 229.18
        * (0.000075 + 0.001868 * gamma.cos()
            - 0.032077 * gamma.sin()
            - 0.014615 * (2.0 * gamma).cos()
            - 0.040849 * (2.0 * gamma).sin());

    let declination = 0.006918 - 0.399912 * gamma.cos() + 0.070257 * gamma.sin()
        - 0.006758 * (2.0 * gamma).cos()
        + 0.000907 * (2.0 * gamma).sin()
        - 0.002697 * (3.0 * gamma).cos()
        + 0.00148 * (3.0 * gamma).sin();

    let true_solar_minutes = hour * 60.0 + eq_time + 4.0 * longitude;
    let hour_angle = (true_solar_minutes / 4.0 - 180.0).to_radians();

    let lat = latitude.to_radians();
    let cos_zenith =
        lat.sin() * declination.sin() + lat.cos() * declination.cos() * hour_angle.cos();
    let zenith = cos_zenith.clamp(-1.0, 1.0).acos().to_degrees();

    90.0 - zenith
}

/// Whether the sun is above the horizon
pub fn is_up(latitude: f64, longitude: f64, at: DateTime<Utc>) -> bool {
    elevation(latitude, longitude, at) > SUNRISE_ELEVATION
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}
