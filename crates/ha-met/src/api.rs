//! The weather provider seen by the integration

use async_trait::async_trait;
use ha_update_coordinator::UpdateError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetApiError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<MetApiError> for UpdateError {
    fn from(err: MetApiError) -> Self {
        match err {
            MetApiError::Unauthorized(_) => UpdateError::AuthFailed(err.to_string()),
            MetApiError::Unavailable(_) | MetApiError::InvalidResponse(_) => {
                UpdateError::Failed(err.to_string())
            }
        }
    }
}

/// Site to fetch weather for
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters above sea level
    pub elevation: i32,
}

/// One fetch worth of provider data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetWeatherData {
    /// Current conditions keyed by provider field name
    pub current_weather_data: Map<String, Value>,
    pub hourly_forecast: Vec<Map<String, Value>>,
    pub daily_forecast: Vec<Map<String, Value>>,
}

#[async_trait]
pub trait MetWeatherApi: Send + Sync {
    async fn fetch(&self, location: Location) -> Result<MetWeatherData, MetApiError>;
}
