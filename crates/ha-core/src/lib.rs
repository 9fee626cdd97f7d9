//! Core host types
//!
//! The small set of types every other crate in the workspace speaks:
//! [`Context`], [`Event`], [`ServiceCall`], [`EntityId`], [`State`] and the
//! [`Platform`] names that config entries forward their setup to.

mod context;
mod entity_id;
mod event;
mod platform;
mod service_call;
mod state;
pub mod sun;

pub use context::Context;
pub use entity_id::{slugify, EntityId, EntityIdError};
pub use event::{Event, EventData, EventType};
pub use platform::Platform;
pub use service_call::ServiceCall;
pub use state::State;

/// State value reported when an entity has no reading
pub const STATE_UNKNOWN: &str = "unknown";

/// State value reported while an entity's data source is failing
pub const STATE_UNAVAILABLE: &str = "unavailable";

/// Standard event types fired on the bus
pub mod events {
    use super::*;

    /// An entity state was written
    pub const STATE_CHANGED: &str = "state_changed";

    /// A service was invoked through the host
    pub const CALL_SERVICE: &str = "call_service";

    /// The core configuration (home location, units, ...) changed
    pub const CORE_CONFIG_UPDATE: &str = "core_config_update";

    /// Data for STATE_CHANGED events
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct StateChangedData {
        pub entity_id: EntityId,
        pub old_state: Option<State>,
        pub new_state: Option<State>,
    }

    impl EventData for StateChangedData {
        fn event_type() -> &'static str {
            STATE_CHANGED
        }
    }

    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct CallServiceData {
        pub domain: String,
        pub service: String,
        pub service_data: serde_json::Value,
    }

    impl EventData for CallServiceData {
        fn event_type() -> &'static str {
            CALL_SERVICE
        }
    }

    /// Data for CORE_CONFIG_UPDATE events
    #[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
    pub struct CoreConfigUpdateData {
        pub latitude: Option<f64>,
        pub longitude: Option<f64>,
        pub elevation: Option<i32>,
        pub location_name: Option<String>,
    }

    impl EventData for CoreConfigUpdateData {
        fn event_type() -> &'static str {
            CORE_CONFIG_UPDATE
        }
    }
}
