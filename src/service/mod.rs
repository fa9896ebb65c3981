//! GenericService: render contexts and save/action dispatch over the repo.

pub mod actions;
mod context;
mod generic;
mod validation;

pub use actions::{ActionHandler, ActionRegistry};
pub use context::RenderContext;
pub use generic::{GenericService, DEFAULT_LOOKUP_LIMIT};
pub use validation::validate_form;
