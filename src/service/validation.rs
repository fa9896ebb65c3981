//! Form field validation from the entity's declared fields.
//!
//! Failures aggregate per field so a form re-render can show every problem
//! at once.

use crate::config::EntityConfig;
use crate::repo::Record;
use serde_json::Value;
use std::collections::BTreeMap;

/// Validate a save payload against every declared form field.
/// Empty map means valid.
pub fn validate_form(entity: &EntityConfig, payload: &Record) -> BTreeMap<String, String> {
    let mut errors = BTreeMap::new();
    for field in entity.form_fields() {
        let value = payload.get(&field.name);
        if field.required && is_blank(value) {
            errors.insert(field.name.clone(), format!("{} is required", field.label));
            continue;
        }
        if field.field_type == "email" {
            if let Some(Value::String(s)) = value {
                if !s.is_empty() && !is_email(s) {
                    errors.insert(
                        field.name.clone(),
                        format!("{} must be a valid email address", field.label),
                    );
                }
            }
        }
    }
    errors
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// Minimal format check: an `@` with a `.` somewhere after it.
fn is_email(s: &str) -> bool {
    s.split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
        .unwrap_or(false)
}
