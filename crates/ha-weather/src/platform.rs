//! Weather platform: the weather entities of every config entry

use dashmap::DashMap;
use ha_core::EntityId;
use ha_hass::HomeAssistant;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::entity::WeatherEntity;

pub struct WeatherPlatform {
    hass: Arc<HomeAssistant>,
    /// entry_id -> entities added for it
    entries: DashMap<String, Vec<Arc<WeatherEntity>>>,
}

impl WeatherPlatform {
    pub fn new(hass: Arc<HomeAssistant>) -> Self {
        Self {
            hass,
            entries: DashMap::new(),
        }
    }

    pub fn hass(&self) -> &Arc<HomeAssistant> {
        &self.hass
    }

    fn taken_ids(&self) -> HashSet<String> {
        let mut taken: HashSet<String> = self
            .entries
            .iter()
            .flat_map(|entities| {
                entities
                    .value()
                    .iter()
                    .map(|entity| entity.entity_id().to_string())
                    .collect::<Vec<_>>()
            })
            .collect();
        taken.extend(self.hass.states.entity_ids(crate::DOMAIN));
        taken
    }

    /// Register entities for an entry and write their first state.
    ///
    /// An entity whose id is already in use gets `_2`, `_3`, ... appended.
    pub fn add_entities(
        &self,
        entry_id: &str,
        entities: Vec<WeatherEntity>,
    ) -> Vec<Arc<WeatherEntity>> {
        let mut taken = self.taken_ids();
        let mut added = Vec::with_capacity(entities.len());

        for mut entity in entities {
            let base = entity.entity_id().clone();
            let mut suffix = 2;
            while taken.contains(&entity.entity_id().to_string()) {
                let object_id = format!("{}_{}", base.object_id(), suffix);
                if let Ok(entity_id) = EntityId::new(base.domain(), object_id) {
                    entity.set_entity_id(entity_id);
                }
                suffix += 1;
            }
            taken.insert(entity.entity_id().to_string());

            let entity = Arc::new(entity);
            entity.write_state();
            info!(entity_id = %entity.entity_id(), entry_id, "Added weather entity");
            added.push(entity);
        }

        self.entries
            .entry(entry_id.to_string())
            .or_default()
            .extend(added.iter().cloned());
        added
    }

    pub fn entities(&self, entry_id: &str) -> Vec<Arc<WeatherEntity>> {
        self.entries
            .get(entry_id)
            .map(|entities| entities.value().clone())
            .unwrap_or_default()
    }

    pub fn entity(&self, entity_id: &str) -> Option<Arc<WeatherEntity>> {
        self.entries.iter().find_map(|entities| {
            entities
                .value()
                .iter()
                .find(|entity| entity.entity_id().to_string() == entity_id)
                .cloned()
        })
    }

    /// Remove every entity of an entry, returning how many there were
    pub fn remove_entry(&self, entry_id: &str) -> usize {
        let Some((_, entities)) = self.entries.remove(entry_id) else {
            return 0;
        };

        for entity in &entities {
            entity.remove();
            debug!(entity_id = %entity.entity_id(), entry_id, "Removed weather entity");
        }
        entities.len()
    }

    pub fn entity_count(&self) -> usize {
        self.entries.iter().map(|entities| entities.value().len()).sum()
    }
}
