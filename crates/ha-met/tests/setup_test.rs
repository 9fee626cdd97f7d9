//! Config entry lifecycle of the met integration

mod common;

use async_trait::async_trait;
use common::{TestHarness, HOME};
use ha_config::{CoreConfig, PLACEHOLDER_LATITUDE, PLACEHOLDER_LONGITUDE};
use ha_config_entries::{
    ConfigEntries, ConfigEntry, ConfigEntryError, ConfigEntryState, ConfigEntryUpdate,
    PlatformHandler,
};
use ha_core::{Context, Platform};
use ha_met::consts::SERVICE_REFRESH;
use ha_met::{MetApiError, MetDataUpdateCoordinator, MetWeatherPlatform, DOMAIN};
use ha_service_registry::ServiceError;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

fn placeholder_home() -> CoreConfig {
    CoreConfig {
        latitude: PLACEHOLDER_LATITUDE,
        longitude: PLACEHOLDER_LONGITUDE,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_track_home_without_home_location_is_not_set_up() {
    for config in [placeholder_home(), CoreConfig::default()] {
        let harness = TestHarness::new(config);
        let entry_id = harness.add_entry("Home", json!({"track_home": true}));

        let state = harness.entries.setup(&entry_id).await.unwrap();

        assert_eq!(state, ConfigEntryState::SetupError);
        let entry = harness.entry(&entry_id);
        assert!(entry.runtime_data.is_none());
        assert_eq!(entry.tries, 0);
        assert!(!harness.entries.reauth_pending(&entry_id));
        assert_eq!(harness.api.fetch_count(), 0);
        assert_eq!(harness.platform.platform().entity_count(), 0);
        assert!(!harness.hass.services.has_service(DOMAIN, SERVICE_REFRESH));
    }
}

#[tokio::test]
async fn test_fixed_site_ignores_missing_home() {
    let harness = TestHarness::new(placeholder_home());
    let entry_id = harness.add_entry(
        "Backyard",
        json!({"track_home": false, "name": "Backyard", "latitude": 60.0, "longitude": 11.0}),
    );

    let state = harness.entries.setup(&entry_id).await.unwrap();

    assert_eq!(state, ConfigEntryState::Loaded);
    assert_eq!(harness.api.fetches()[0].latitude, 60.0);
    harness.assert_state("weather.backyard", "cloudy");

    let entity = harness.platform.platform().entity("weather.backyard").unwrap();
    assert_eq!(entity.name().as_deref(), Some("Backyard"));
    assert!(!harness.coordinator(&entry_id).is_tracking_home());
}

#[tokio::test]
async fn test_setup_tracking_home() {
    let harness = TestHarness::with_home();
    let entry_id = harness.add_entry("Home", json!({"track_home": true}));

    let state = harness.entries.setup(&entry_id).await.unwrap();

    assert_eq!(state, ConfigEntryState::Loaded);
    let coordinator = harness.coordinator(&entry_id);
    assert!(coordinator.is_tracking_home());
    assert_eq!(coordinator.location().latitude, HOME.0);
    assert!(harness
        .entries
        .loaded_platforms(&entry_id)
        .contains(&Platform::Weather));
    assert!(harness.hass.services.has_service(DOMAIN, SERVICE_REFRESH));

    // Named after the home location
    harness.assert_state("weather.oslo", "cloudy");
    let state = harness.hass.states.get("weather.oslo").unwrap();
    assert_eq!(state.attributes["temperature"], json!(21.5));
    assert_eq!(state.attributes["friendly_name"], json!("Oslo"));
}

#[tokio::test]
async fn test_tracking_follows_home_location() {
    let harness = TestHarness::with_home();
    let entry_id = harness.add_entry("Home", json!({"track_home": true}));
    harness.entries.setup(&entry_id).await.unwrap();

    harness.hass.update_config(|config| {
        config.latitude = 60.3913;
        config.longitude = 5.3221;
    });

    assert!(harness.api.wait_for_fetch_at(60.3913).await);
    let location = harness.coordinator(&entry_id).location();
    assert_eq!(location.latitude, 60.3913);
    assert_eq!(location.longitude, 5.3221);
}

#[tokio::test]
async fn test_fixed_site_does_not_follow_home() {
    let harness = TestHarness::with_home();
    let entry_id = harness.add_entry("Cabin", json!({"latitude": 61.0, "longitude": 9.0}));
    harness.entries.setup(&entry_id).await.unwrap();
    let fetches = harness.api.fetch_count();

    harness.hass.update_config(|config| config.latitude = 62.0);

    assert!(!harness.api.wait_for_fetch_at(62.0).await);
    assert_eq!(harness.api.fetch_count(), fetches);
}

#[tokio::test]
async fn test_unavailable_api_retries() {
    let harness = TestHarness::with_home();
    harness
        .api
        .respond_with(Err(MetApiError::Unavailable("503".into())));
    let entry_id = harness.add_entry("Home", json!({"track_home": true}));

    let state = harness.entries.setup(&entry_id).await.unwrap();

    assert_eq!(state, ConfigEntryState::SetupRetry);
    let entry = harness.entry(&entry_id);
    assert_eq!(entry.tries, 1);
    assert!(entry.runtime_data.is_none());
    assert!(!harness.entries.reauth_pending(&entry_id));
}

#[tokio::test]
async fn test_unauthorized_api_requests_reauth() {
    let harness = TestHarness::with_home();
    harness
        .api
        .respond_with(Err(MetApiError::Unauthorized("403".into())));
    let entry_id = harness.add_entry("Home", json!({"track_home": true}));

    let state = harness.entries.setup(&entry_id).await.unwrap();

    assert_eq!(state, ConfigEntryState::SetupError);
    assert!(harness.entries.reauth_pending(&entry_id));
}

/// Delegates to the met weather platform, recording whether the coordinator
/// was still tracking home when the platform was unloaded
struct RecordingPlatform {
    inner: Arc<MetWeatherPlatform>,
    tracking_at_unload: Mutex<Option<bool>>,
}

#[async_trait]
impl PlatformHandler<MetDataUpdateCoordinator> for RecordingPlatform {
    async fn setup_entry(
        &self,
        entries: &Arc<ConfigEntries<MetDataUpdateCoordinator>>,
        entry: &ConfigEntry<MetDataUpdateCoordinator>,
    ) -> Result<(), ConfigEntryError> {
        self.inner.setup_entry(entries, entry).await
    }

    async fn unload_entry(
        &self,
        entries: &Arc<ConfigEntries<MetDataUpdateCoordinator>>,
        entry: &ConfigEntry<MetDataUpdateCoordinator>,
    ) -> bool {
        let tracking = entry
            .runtime_data
            .as_ref()
            .map(|coordinator| coordinator.is_tracking_home());
        *self.tracking_at_unload.lock().unwrap() = tracking;
        self.inner.unload_entry(entries, entry).await
    }
}

#[tokio::test]
async fn test_unload_untracks_before_platform_unload() {
    let harness = TestHarness::with_home();
    let recording = Arc::new(RecordingPlatform {
        inner: harness.platform.clone(),
        tracking_at_unload: Mutex::new(None),
    });
    harness
        .entries
        .register_platform(DOMAIN, Platform::Weather, recording.clone());

    let entry_id = harness.add_entry("Home", json!({"track_home": true}));
    harness.entries.setup(&entry_id).await.unwrap();
    let coordinator = harness.coordinator(&entry_id);
    assert!(coordinator.is_tracking_home());

    let state = harness.entries.unload(&entry_id).await.unwrap();

    assert_eq!(state, ConfigEntryState::NotLoaded);
    assert_eq!(*recording.tracking_at_unload.lock().unwrap(), Some(false));
    assert!(!coordinator.is_tracking_home());
    assert!(harness.entry(&entry_id).runtime_data.is_none());
    assert!(harness.hass.states.get("weather.oslo").is_none());
    assert_eq!(coordinator.coordinator().listener_count(), 0);
}

#[tokio::test]
async fn test_refresh_service_is_admin_only() {
    let harness = TestHarness::with_home();
    harness.hass.services.add_user("admin", true);
    harness.hass.services.add_user("guest", false);
    let entry_id = harness.add_entry("Home", json!({"track_home": true}));
    harness.entries.setup(&entry_id).await.unwrap();
    let fetches = harness.api.fetch_count();

    harness
        .hass
        .call_service(DOMAIN, SERVICE_REFRESH, json!({}), Context::with_user("admin"))
        .await
        .unwrap();
    assert_eq!(harness.api.fetch_count(), fetches + 1);

    let result = harness
        .hass
        .call_service(DOMAIN, SERVICE_REFRESH, json!({}), Context::with_user("guest"))
        .await;
    assert!(matches!(result, Err(ServiceError::Unauthorized { .. })));
    assert_eq!(harness.api.fetch_count(), fetches + 1);
}

#[tokio::test]
async fn test_refresh_after_unload_does_nothing() {
    let harness = TestHarness::with_home();
    let entry_id = harness.add_entry("Home", json!({"track_home": true}));
    harness.entries.setup(&entry_id).await.unwrap();
    harness.entries.unload(&entry_id).await.unwrap();
    let fetches = harness.api.fetch_count();

    harness
        .hass
        .call_service(DOMAIN, SERVICE_REFRESH, json!({}), Context::new())
        .await
        .unwrap();

    assert_eq!(harness.api.fetch_count(), fetches);
}

#[tokio::test]
async fn test_options_update_reloads_entry() {
    let harness = TestHarness::with_home();
    let entry_id = harness.add_entry("Home", json!({"track_home": true}));
    harness.entries.setup(&entry_id).await.unwrap();
    let before = harness.coordinator(&entry_id);

    let options = HashMap::from([("forecast".to_string(), json!("hourly"))]);
    harness
        .entries
        .update(&entry_id, ConfigEntryUpdate::new().options(options))
        .await
        .unwrap();

    let entry = harness.entry(&entry_id);
    assert_eq!(entry.state, ConfigEntryState::Loaded);
    let after = harness.coordinator(&entry_id);
    assert!(!Arc::ptr_eq(&before, &after));
    assert!(!before.is_tracking_home());
    assert!(after.is_tracking_home());
    harness.assert_state("weather.oslo", "cloudy");
    assert_eq!(harness.platform.platform().entity_count(), 1);
}
