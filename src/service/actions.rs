//! Typed action dispatch: one handler implementation per declared action,
//! registered in a map at startup.

use crate::config::EntityConfig;
use crate::error::ActionError;
use crate::repo::Record;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Implemented once per action name declared in config (e.g. `export_csv`).
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn run(&self, entity: &EntityConfig, payload: &Record) -> Result<Value, ActionError>;
}

/// Action name -> handler, built at startup and shared via `Arc`.
/// A declared action without a registered handler dispatches to 501.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ActionHandler>> {
        self.handlers.get(name)
    }
}
