//! crudkit: YAML-driven generic CRUD backend library.
//!
//! Entity definitions (table, list columns, form sections, actions) come
//! from entities.yaml; a generic service/repository pair serves
//! list/detail/form/save/action for any declared entity.

pub mod config;
pub mod error;
pub mod handlers;
pub mod repo;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;

pub use config::{load_entities, parse_entities, EntityConfig, EntityRegistry};
pub use error::{ActionError, ConfigError, RepoError};
pub use repo::{EntityRepo, GenericRepo, Record};
pub use routes::{common_routes, common_routes_with_ready, entity_routes};
pub use service::{ActionHandler, ActionRegistry, GenericService, RenderContext};
pub use state::AppState;
