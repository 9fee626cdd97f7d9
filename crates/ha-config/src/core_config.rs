//! Core configuration (`homeassistant:` section)

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Latitude a fresh install starts with before the user sets a home
pub const PLACEHOLDER_LATITUDE: f64 = 52.3731339;
/// Longitude a fresh install starts with before the user sets a home
pub const PLACEHOLDER_LONGITUDE: f64 = 4.8903147;

/// Unit system readings are presented in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnitSystem {
    #[default]
    Metric,
    /// Also accepted as `us_customary`
    #[serde(alias = "us_customary")]
    Imperial,
}

impl UnitSystem {
    pub fn is_metric(&self) -> bool {
        matches!(self, UnitSystem::Metric)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Name of the home location
    #[serde(rename = "name", default = "default_name")]
    pub location_name: String,

    #[serde(default)]
    pub latitude: f64,

    #[serde(default)]
    pub longitude: f64,

    /// Meters above sea level
    #[serde(default)]
    pub elevation: i32,

    #[serde(default)]
    pub unit_system: UnitSystem,

    #[serde(default = "default_time_zone")]
    pub time_zone: String,
}

fn default_name() -> String {
    "Home".to_string()
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            location_name: default_name(),
            latitude: 0.0,
            longitude: 0.0,
            elevation: 0,
            unit_system: UnitSystem::Metric,
            time_zone: default_time_zone(),
        }
    }
}

impl CoreConfig {
    /// Read `configuration.yaml` from a config directory
    pub fn load(config_dir: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = config_dir.as_ref().join("configuration.yaml");
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadFile {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "Loading core configuration");
        Self::from_yaml_str(&content)
    }

    /// Parse a full configuration document, using its `homeassistant:`
    /// section. A document without that section yields the defaults.
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let root: serde_yaml::Value = serde_yaml::from_str(content)?;

        let section = match root {
            serde_yaml::Value::Null => return Ok(Self::default()),
            serde_yaml::Value::Mapping(mut mapping) => mapping.remove("homeassistant"),
            _ => {
                return Err(ConfigError::InvalidValue {
                    key: "root".to_string(),
                    reason: "configuration must be a mapping".to_string(),
                })
            }
        };

        let config: Self = match section {
            None | Some(serde_yaml::Value::Null) => Self::default(),
            Some(value) => serde_yaml::from_value(value)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ConfigError::InvalidValue {
                key: "latitude".to_string(),
                reason: format!("{} is outside -90..=90", self.latitude),
            });
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ConfigError::InvalidValue {
                key: "longitude".to_string(),
                reason: format!("{} is outside -180..=180", self.longitude),
            });
        }
        Ok(())
    }

    pub fn is_metric(&self) -> bool {
        self.unit_system.is_metric()
    }

    /// Whether a real home location has been configured.
    ///
    /// False when both coordinates are zero or when they still hold the
    /// placeholder pair a new install is seeded with.
    pub fn has_home_location(&self) -> bool {
        let unset = self.latitude == 0.0 && self.longitude == 0.0;
        let placeholder =
            self.latitude == PLACEHOLDER_LATITUDE && self.longitude == PLACEHOLDER_LONGITUDE;
        !unset && !placeholder
    }
}
