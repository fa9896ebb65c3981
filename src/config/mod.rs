pub mod loader;
pub mod registry;
pub mod types;
pub mod validator;

pub use loader::{load_entities, parse_entities};
pub use registry::EntityRegistry;
pub use types::*;
pub use validator::validate_entity;
