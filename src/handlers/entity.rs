//! Entity view handlers: list, detail, form, save, lookup, action.
//!
//! Thin binding only: parse request parts, call the service, translate the
//! context's status into an HTTP code with the context as JSON body.

use crate::repo::Record;
use crate::service::RenderContext;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

fn respond(ctx: RenderContext) -> Response {
    let status = StatusCode::from_u16(ctx.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ctx)).into_response()
}

/// Primary keys are untyped in config: numeric path segments bind as
/// numbers, everything else as text.
fn pk_value(s: &str) -> Value {
    s.parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(s.to_string()))
}

fn body_to_record(entity_name: &str, mode: &'static str, body: Value) -> Result<Record, Response> {
    match body {
        Value::Object(m) => Ok(m),
        _ => Err(respond(RenderContext::failure(
            mode,
            entity_name,
            400,
            "body must be a JSON object".to_string(),
        ))),
    }
}

pub async fn list(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let page = params.get("page").and_then(|v| v.parse().ok()).unwrap_or(1);
    let page_size = params.get("page_size").and_then(|v| v.parse().ok());
    let sort = params.get("sort").map(String::as_str);
    respond(state.service.render_list(&entity, page, page_size, sort).await)
}

pub async fn detail(
    State(state): State<AppState>,
    Path((entity, pk)): Path<(String, String)>,
) -> Response {
    respond(state.service.render_detail(&entity, &pk_value(&pk)).await)
}

pub async fn form_new(State(state): State<AppState>, Path(entity): Path<String>) -> Response {
    respond(state.service.render_form(&entity, None).await)
}

pub async fn form_edit(
    State(state): State<AppState>,
    Path((entity, pk)): Path<(String, String)>,
) -> Response {
    respond(state.service.render_form(&entity, Some(&pk_value(&pk))).await)
}

pub async fn save(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let payload = match body_to_record(&entity, "form", body) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    respond(state.service.handle_save(&entity, &payload).await)
}

pub async fn lookup(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let q = params.get("q").map(String::as_str).unwrap_or("");
    let limit = params.get("limit").and_then(|v| v.parse().ok());
    respond(state.service.handle_lookup(&entity, q, limit).await)
}

pub async fn action(
    State(state): State<AppState>,
    Path((entity, action)): Path<(String, String)>,
    body: Option<Json<Value>>,
) -> Response {
    let body = body.map(|Json(v)| v).unwrap_or(Value::Object(Record::new()));
    let payload = match body_to_record(&entity, "action", body) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    respond(state.service.handle_action(&entity, &action, &payload).await)
}
