//! RenderContext: the sole contract between the service and the route layer.
//!
//! A tagged result rather than an exception: `ok`/`status` carry the
//! classification, the optional fields carry the mode-specific payload. The
//! route layer only translates `status` into an HTTP code and renders the
//! rest.

use crate::config::{ActionSpec, ColumnSpec, FormConfig};
use crate::repo::Record;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Serialize)]
pub struct RenderContext {
    pub ok: bool,
    pub status: u16,
    pub mode: &'static str,
    pub entity_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Record>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<ColumnSpec>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<ActionSpec>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<FormConfig>,
    /// Per-field validation messages (field name -> message).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
    /// Action handler return value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl RenderContext {
    pub fn success(mode: &'static str, entity_name: &str) -> Self {
        RenderContext {
            ok: true,
            status: 200,
            mode,
            entity_name: entity_name.to_string(),
            error: None,
            rows: None,
            columns: None,
            actions: None,
            page: None,
            page_size: None,
            sort: None,
            record: None,
            form: None,
            errors: None,
            result: None,
        }
    }

    pub fn failure(mode: &'static str, entity_name: &str, status: u16, error: String) -> Self {
        RenderContext {
            ok: false,
            status,
            error: Some(error),
            ..RenderContext::success(mode, entity_name)
        }
    }
}
