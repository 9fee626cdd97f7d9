//! The central HomeAssistant handle
//!
//! Integrations receive an `Arc<HomeAssistant>` and reach the event bus,
//! state store, service registry and core configuration through it.

use ha_config::CoreConfig;
use ha_core::events::{CallServiceData, CoreConfigUpdateData};
use ha_core::Context;
use ha_event_bus::EventBus;
use ha_service_registry::{ServiceRegistry, ServiceResult};
use ha_state_store::StateStore;
use std::sync::{Arc, RwLock};
use tracing::info;

pub struct HomeAssistant {
    /// Event bus for pub/sub communication
    pub bus: Arc<EventBus>,
    /// Entity states
    pub states: Arc<StateStore>,
    /// Registered services
    pub services: Arc<ServiceRegistry>,
    config: RwLock<CoreConfig>,
}

impl HomeAssistant {
    pub fn new(config: CoreConfig) -> Self {
        let bus = Arc::new(EventBus::new());
        let states = Arc::new(StateStore::new(bus.clone()));
        let services = Arc::new(ServiceRegistry::new());

        Self {
            bus,
            states,
            services,
            config: RwLock::new(config),
        }
    }

    /// Snapshot of the core configuration
    pub fn config(&self) -> CoreConfig {
        match self.config.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Change the core configuration and fire `core_config_update`
    pub fn update_config(&self, update: impl FnOnce(&mut CoreConfig)) {
        let updated = {
            let mut config = match self.config.write() {
                Ok(config) => config,
                Err(poisoned) => poisoned.into_inner(),
            };
            update(&mut config);
            config.clone()
        };

        info!(
            latitude = updated.latitude,
            longitude = updated.longitude,
            "Core configuration updated"
        );

        self.bus.fire_typed(
            CoreConfigUpdateData {
                latitude: Some(updated.latitude),
                longitude: Some(updated.longitude),
                elevation: Some(updated.elevation),
                location_name: Some(updated.location_name),
            },
            Context::new(),
        );
    }
}

impl HomeAssistant {
    /// Announce a service call on the bus, then run it
    pub async fn call_service(
        &self,
        domain: &str,
        service: &str,
        service_data: serde_json::Value,
        context: Context,
    ) -> ServiceResult {
        self.bus.fire_typed(
            CallServiceData {
                domain: domain.to_string(),
                service: service.to_string(),
                service_data: service_data.clone(),
            },
            context.clone(),
        );
        self.services.call(domain, service, service_data, context).await
    }
}

impl Default for HomeAssistant {
    fn default() -> Self {
        Self::new(CoreConfig::default())
    }
}
