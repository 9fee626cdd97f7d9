//! Config entry setup and unload for met

use async_trait::async_trait;
use futures::FutureExt;
use ha_config_entries::{
    ConfigEntries, ConfigEntry, ConfigEntryError, IntegrationHandler, SetupOutcome,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::api::MetWeatherApi;
use crate::consts::{CONF_TRACK_HOME, DOMAIN, PLATFORMS, SERVICE_REFRESH};
use crate::coordinator::MetDataUpdateCoordinator;

pub struct MetIntegration {
    api: Arc<dyn MetWeatherApi>,
}

impl MetIntegration {
    pub fn new(api: Arc<dyn MetWeatherApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl IntegrationHandler<MetDataUpdateCoordinator> for MetIntegration {
    #[instrument(skip_all, fields(entry_id = %entry.entry_id))]
    async fn setup_entry(
        &self,
        entries: &Arc<ConfigEntries<MetDataUpdateCoordinator>>,
        entry: &mut ConfigEntry<MetDataUpdateCoordinator>,
    ) -> Result<SetupOutcome, ConfigEntryError> {
        let hass = entries.hass().clone();
        let track_home = entry.get_bool(CONF_TRACK_HOME, false);

        if track_home && !hass.config().has_home_location() {
            warn!("Skip setting up met.no integration; No Home location has been set");
            return Ok(SetupOutcome::NotReady);
        }

        let coordinator = Arc::new(MetDataUpdateCoordinator::new(
            hass.clone(),
            entry,
            self.api.clone(),
        ));
        coordinator.config_entry_first_refresh().await?;

        if track_home {
            coordinator.track_home();
        }

        entry.runtime_data = Some(coordinator.clone());

        let remove_listener = entry.add_update_listener(Arc::new(
            |entries: Arc<ConfigEntries<MetDataUpdateCoordinator>>,
             entry: ConfigEntry<MetDataUpdateCoordinator>| {
                async move {
                    if let Err(err) = entries.reload(&entry.entry_id).await {
                        warn!(entry_id = %entry.entry_id, %err, "Reload after update failed");
                    }
                }
                .boxed()
            },
        ));
        entry.on_unload(remove_listener);

        let untrack = coordinator.clone();
        entry.on_unload(move || untrack.untrack_home());

        let shutdown = coordinator.clone();
        entry.on_unload(move || shutdown.shutdown());

        entries.forward_entry_setups(entry, &PLATFORMS).await?;

        let refresh = Arc::downgrade(&coordinator);
        hass.services
            .register_admin(DOMAIN, SERVICE_REFRESH, move |_call| {
                let refresh = refresh.clone();
                async move {
                    if let Some(coordinator) = refresh.upgrade() {
                        coordinator.request_refresh().await;
                    }
                    Ok(None)
                }
            });

        info!(
            track_home,
            latitude = coordinator.location().latitude,
            longitude = coordinator.location().longitude,
            "Set up met.no weather"
        );
        Ok(SetupOutcome::Loaded)
    }

    #[instrument(skip_all, fields(entry_id = %entry.entry_id))]
    async fn unload_entry(
        &self,
        entries: &Arc<ConfigEntries<MetDataUpdateCoordinator>>,
        entry: &ConfigEntry<MetDataUpdateCoordinator>,
    ) -> bool {
        if let Some(coordinator) = &entry.runtime_data {
            coordinator.untrack_home();
        }
        entries.unload_platforms(entry, &PLATFORMS).await
    }
}
