//! Core configuration
//!
//! Parses the `homeassistant:` section of `configuration.yaml`: the home
//! location that weather integrations follow, and the unit system readings
//! are displayed in.
//!
//! ```ignore
//! use ha_config::CoreConfig;
//!
//! let config = CoreConfig::load("/config")?;
//! if config.has_home_location() {
//!     println!("home at {}, {}", config.latitude, config.longitude);
//! }
//! ```

mod core_config;
mod error;

pub use core_config::{CoreConfig, UnitSystem, PLACEHOLDER_LATITUDE, PLACEHOLDER_LONGITUDE};
pub use error::{ConfigError, ConfigResult};
