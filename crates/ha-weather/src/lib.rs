//! Weather entity platform
//!
//! Integrations implement [`WeatherSource`] and hand their sources to the
//! [`WeatherPlatform`] as [`WeatherEntity`]s. The entity turns native readings
//! into state attributes in the host's unit system and keeps the state store
//! current while it follows a coordinator.

pub mod consts;
mod entity;
mod platform;
mod source;
pub mod units;

pub use consts::*;
pub use entity::WeatherEntity;
pub use platform::WeatherPlatform;
pub use source::{Forecast, WeatherSource};
pub use units::{PrecipitationUnit, PressureUnit, SpeedUnit, TemperatureUnit};
