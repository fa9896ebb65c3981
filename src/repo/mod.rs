//! Repository layer: schema-driven list/detail/lookup/save.

mod generic;
pub use generic::{EntityRepo, GenericRepo, Record};
