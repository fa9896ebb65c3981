//! Demo server: loads entities.yaml, registers a sample action handler, and
//! mounts the common and entity routes.

use async_trait::async_trait;
use axum::Router;
use crudkit::{
    common_routes_with_ready, entity_routes, load_entities, ActionHandler, ActionRegistry,
    AppState, EntityConfig, Record,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// Sample action: reports how many rows an export would cover.
struct ExportCsv;

#[async_trait]
impl ActionHandler for ExportCsv {
    async fn run(
        &self,
        entity: &EntityConfig,
        payload: &Record,
    ) -> Result<Value, crudkit::ActionError> {
        let ids = payload.get("ids").and_then(Value::as_array).map(Vec::len).unwrap_or(0);
        Ok(json!({"entity": entity.name, "exported": ids}))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("crudkit=info".parse()?))
        .init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/crudkit".into());
    let pool_size: u32 = std::env::var("DB_POOL_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(5);
    let pool_timeout: u64 =
        std::env::var("DB_POOL_TIMEOUT").ok().and_then(|v| v.parse().ok()).unwrap_or(30);
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(pool_size)
        .acquire_timeout(Duration::from_secs(pool_timeout))
        .connect(&database_url)
        .await?;

    let entities_path =
        std::env::var("ENTITIES_PATH").unwrap_or_else(|_| "demos/entities.yaml".into());
    let registry = load_entities(&entities_path)?;
    tracing::info!(entities = registry.len(), path = %entities_path, "loaded entity config");

    let mut actions = ActionRegistry::new();
    actions.register("export_csv", Arc::new(ExportCsv));

    let state = AppState::new(pool, registry, actions);
    let app = Router::new()
        .merge(common_routes_with_ready(state.clone()))
        .merge(entity_routes(state))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind("0.0.0.0:3000").await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
