//! Shared application state for all routes.

use crate::config::EntityRegistry;
use crate::repo::GenericRepo;
use crate::service::{ActionRegistry, GenericService};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub service: Arc<GenericService<GenericRepo>>,
}

impl AppState {
    pub fn new(pool: PgPool, registry: EntityRegistry, actions: ActionRegistry) -> Self {
        let service = GenericService::new(
            Arc::new(registry),
            GenericRepo::new(pool.clone()),
            Arc::new(actions),
        );
        AppState {
            pool,
            service: Arc::new(service),
        }
    }
}
