//! Immutable entity lookup, built once at startup and shared via `Arc`.

use crate::config::EntityConfig;
use std::collections::HashMap;

#[derive(Clone, Debug, Default)]
pub struct EntityRegistry {
    entities: Vec<EntityConfig>,
    by_name: HashMap<String, usize>,
}

impl EntityRegistry {
    pub fn new(entities: Vec<EntityConfig>) -> Self {
        let by_name = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();
        EntityRegistry { entities, by_name }
    }

    pub fn get(&self, name: &str) -> Option<&EntityConfig> {
        self.by_name.get(name).map(|&i| &self.entities[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityConfig> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
