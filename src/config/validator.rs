//! Load-time validation: identifier safety and schema consistency.
//!
//! Anything that would later be interpolated into SQL as an identifier
//! (table, primary key, column and field names) is checked here, so a bad
//! config fails the load instead of a request.

use crate::config::EntityConfig;
use crate::sql::is_identifier;

/// Collect every problem with one entity; empty vec means valid.
pub fn validate_entity(entity: &EntityConfig) -> Vec<String> {
    let mut errors = Vec::new();
    let name = &entity.name;

    if !is_identifier(&entity.table) {
        errors.push(format!("entity '{}': unsafe table name '{}'", name, entity.table));
    }
    if !is_identifier(&entity.primary_key) {
        errors.push(format!(
            "entity '{}': unsafe primary_key '{}'",
            name, entity.primary_key
        ));
    }
    if entity.list.columns.is_empty() {
        errors.push(format!("entity '{}': list.columns must not be empty", name));
    }
    for col in &entity.list.columns {
        if !is_identifier(&col.name) {
            errors.push(format!(
                "entity '{}': unsafe list column name '{}'",
                name, col.name
            ));
        }
    }
    for field in entity.form_fields() {
        if !is_identifier(&field.name) {
            errors.push(format!(
                "entity '{}': unsafe form field name '{}'",
                name, field.name
            ));
        }
    }
    if let Some(sort) = &entity.list.default_sort {
        let col = sort.strip_prefix('-').unwrap_or(sort);
        if !is_identifier(col) {
            errors.push(format!("entity '{}': unsafe default_sort '{}'", name, sort));
        }
    }

    errors
}
