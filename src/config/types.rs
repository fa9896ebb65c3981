//! Entity schema types matching the entities.yaml shape.
//!
//! The YAML root is a mapping of entity name to entity body; the loader
//! injects the name to produce [`EntityConfig`].

use serde::{Deserialize, Serialize};

/// One column of the list view.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub sortable: Option<bool>,
}

/// A declared action (toolbar button); dispatch is by `name`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionSpec {
    pub name: String,
    pub label: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListConfig {
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub default_sort: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
}

fn default_page_size() -> u32 {
    20
}

/// One form field. `type` drives input rendering and validation
/// (`email` gets the format check in the service layer).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    #[serde(rename = "type", default = "default_field_type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
}

fn default_field_type() -> String {
    "text".into()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SectionSpec {
    pub label: String,
    pub fields: Vec<FieldSpec>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FormConfig {
    pub sections: Vec<SectionSpec>,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
}

/// Entity body as written in YAML (name comes from the mapping key).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityBody {
    pub table: String,
    pub label: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    pub list: ListConfig,
    pub form: FormConfig,
}

fn default_primary_key() -> String {
    "id".into()
}

/// Normalized entity schema: immutable after load.
#[derive(Clone, Debug, Serialize)]
pub struct EntityConfig {
    pub name: String,
    pub table: String,
    pub label: String,
    pub primary_key: String,
    pub list: ListConfig,
    pub form: FormConfig,
}

impl EntityConfig {
    pub fn from_body(name: &str, body: EntityBody) -> Self {
        EntityConfig {
            name: name.to_string(),
            table: body.table,
            label: body.label,
            primary_key: body.primary_key,
            list: body.list,
            form: body.form,
        }
    }

    /// All declared form field names, in section order.
    pub fn form_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.form.sections.iter().flat_map(|s| s.fields.iter())
    }

    /// Look up an action by name: form actions first, then list actions.
    pub fn find_action(&self, action_name: &str) -> Option<&ActionSpec> {
        self.form
            .actions
            .iter()
            .chain(self.list.actions.iter())
            .find(|a| a.name == action_name)
    }
}
