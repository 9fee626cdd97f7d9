//! Entity platforms an integration can forward its config entry to

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity platform name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Weather,
}

impl Platform {
    /// Domain string of entities created by this platform
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Weather => "weather",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
