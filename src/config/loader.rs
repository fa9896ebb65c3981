//! Load entities.yaml into an [`EntityRegistry`].
//!
//! Errors across all entities are aggregated so a config author sees every
//! problem in one pass, not just the first.

use crate::config::registry::EntityRegistry;
use crate::config::types::{EntityBody, EntityConfig};
use crate::config::validator::validate_entity;
use crate::error::ConfigError;
use std::path::Path;

/// Load and validate entity definitions from a YAML file.
pub fn load_entities(path: impl AsRef<Path>) -> Result<EntityRegistry, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_entities(&raw)
}

/// Parse and validate entity definitions from a YAML string.
/// An empty document yields an empty registry.
pub fn parse_entities(yaml: &str) -> Result<EntityRegistry, ConfigError> {
    let root: Option<serde_yaml::Mapping> = serde_yaml::from_str(yaml)?;
    let Some(root) = root else {
        return Ok(EntityRegistry::default());
    };

    let mut entities = Vec::new();
    let mut errors = Vec::new();

    for (key, value) in root {
        let Some(name) = key.as_str().map(str::to_string) else {
            errors.push(format!("entity key must be a string, got {:?}", key));
            continue;
        };
        match serde_yaml::from_value::<EntityBody>(value) {
            Ok(body) => {
                let entity = EntityConfig::from_body(&name, body);
                let entity_errors = validate_entity(&entity);
                if entity_errors.is_empty() {
                    entities.push(entity);
                } else {
                    errors.extend(entity_errors);
                }
            }
            Err(e) => errors.push(format!("entity '{}': {}", name, e)),
        }
    }

    if errors.is_empty() {
        Ok(EntityRegistry::new(entities))
    } else {
        Err(ConfigError::Invalid(errors))
    }
}
