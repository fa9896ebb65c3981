//! Entity view routes built over the generic service.
//! Parameterized paths: handlers resolve the entity by name per request.

use crate::handlers::entity::{action, detail, form_edit, form_new, list, lookup, save};
use crate::state::AppState;
use axum::{routing::get, routing::post, Router};

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .route("/:entity", get(list))
        .route("/:entity/new", get(form_new))
        .route("/:entity/save", post(save))
        .route("/:entity/lookup", get(lookup))
        .route("/:entity/action/:action", post(action))
        .route("/:entity/:pk", get(detail))
        .route("/:entity/:pk/edit", get(form_edit))
        .with_state(state)
}
