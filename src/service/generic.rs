//! Generic service: turns repository results and failures into a uniform
//! [`RenderContext`]. This is the sole classification boundary; no error
//! crosses it to the route layer.

use crate::config::EntityRegistry;
use crate::error::{ActionError, RepoError};
use crate::repo::{EntityRepo, Record};
use crate::service::actions::ActionRegistry;
use crate::service::context::RenderContext;
use crate::service::validation::validate_form;
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_LOOKUP_LIMIT: u32 = 10;

pub struct GenericService<R> {
    registry: Arc<EntityRegistry>,
    repo: R,
    actions: Arc<ActionRegistry>,
}

impl<R: EntityRepo> GenericService<R> {
    pub fn new(registry: Arc<EntityRegistry>, repo: R, actions: Arc<ActionRegistry>) -> Self {
        GenericService {
            registry,
            repo,
            actions,
        }
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Paginated list context: rows plus the list config the template needs.
    pub async fn render_list(
        &self,
        entity_name: &str,
        page: i64,
        page_size: Option<u32>,
        sort: Option<&str>,
    ) -> RenderContext {
        let Some(entity) = self.registry.get(entity_name) else {
            return unknown_entity(entity_name, "list");
        };
        match self.repo.fetch_list(entity, page, page_size, sort).await {
            Ok(rows) => {
                let mut ctx = RenderContext::success("list", entity_name);
                ctx.rows = Some(rows);
                ctx.columns = Some(entity.list.columns.clone());
                ctx.actions = Some(entity.list.actions.clone());
                ctx.page = Some(page.max(1));
                ctx.page_size = Some(page_size.unwrap_or(entity.list.page_size));
                ctx.sort = sort
                    .map(str::to_string)
                    .or_else(|| entity.list.default_sort.clone());
                ctx
            }
            Err(e) => repo_failure("list", entity_name, e),
        }
    }

    /// Single-record view context.
    pub async fn render_detail(&self, entity_name: &str, pk: &Value) -> RenderContext {
        let Some(entity) = self.registry.get(entity_name) else {
            return unknown_entity(entity_name, "view");
        };
        match self.repo.fetch_detail(entity, pk).await {
            Ok(Some(record)) => {
                let mut ctx = RenderContext::success("view", entity_name);
                ctx.record = Some(record);
                ctx.actions = Some(entity.form.actions.clone());
                ctx
            }
            Ok(None) => RenderContext::failure(
                "view",
                entity_name,
                404,
                format!("{} not found", entity_name),
            ),
            Err(e) => repo_failure("view", entity_name, e),
        }
    }

    /// Form context: create mode without a key, edit mode with one.
    pub async fn render_form(&self, entity_name: &str, pk: Option<&Value>) -> RenderContext {
        let Some(entity) = self.registry.get(entity_name) else {
            return unknown_entity(entity_name, "form");
        };
        let mode = if pk.is_some() { "edit" } else { "create" };

        let record = match pk {
            None => None,
            Some(pk) => match self.repo.fetch_detail(entity, pk).await {
                Ok(Some(record)) => Some(record),
                Ok(None) => {
                    return RenderContext::failure(
                        mode,
                        entity_name,
                        404,
                        format!("{} not found", entity_name),
                    );
                }
                Err(e) => return repo_failure(mode, entity_name, e),
            },
        };

        let mut ctx = RenderContext::success(mode, entity_name);
        ctx.record = record;
        ctx.form = Some(entity.form.clone());
        ctx.actions = Some(entity.form.actions.clone());
        ctx
    }

    /// Validate, then insert or update. Validation failures return a 400
    /// context with per-field messages and never touch the repository.
    pub async fn handle_save(&self, entity_name: &str, payload: &Record) -> RenderContext {
        let Some(entity) = self.registry.get(entity_name) else {
            return unknown_entity(entity_name, "form");
        };

        let errors = validate_form(entity, payload);
        if !errors.is_empty() {
            let mut ctx = RenderContext::failure(
                "form",
                entity_name,
                400,
                "validation failed".to_string(),
            );
            ctx.errors = Some(errors);
            ctx.form = Some(entity.form.clone());
            ctx.record = Some(payload.clone());
            ctx
        } else {
            match self.repo.save(entity, payload).await {
                Ok(record) => {
                    let mut ctx = RenderContext::success("view", entity_name);
                    ctx.record = Some(record);
                    ctx
                }
                Err(e) => repo_failure("form", entity_name, e),
            }
        }
    }

    /// Modal-search lookup: `{pk, display}` rows matching a substring.
    pub async fn handle_lookup(
        &self,
        entity_name: &str,
        query: &str,
        limit: Option<u32>,
    ) -> RenderContext {
        let Some(entity) = self.registry.get(entity_name) else {
            return unknown_entity(entity_name, "lookup");
        };
        let limit = limit.unwrap_or(DEFAULT_LOOKUP_LIMIT);
        match self.repo.search_lookup(entity, query, limit).await {
            Ok(rows) => {
                let mut ctx = RenderContext::success("lookup", entity_name);
                ctx.rows = Some(rows);
                ctx
            }
            Err(e) => repo_failure("lookup", entity_name, e),
        }
    }

    /// Dispatch a declared action to its registered handler.
    pub async fn handle_action(
        &self,
        entity_name: &str,
        action_name: &str,
        payload: &Record,
    ) -> RenderContext {
        let Some(entity) = self.registry.get(entity_name) else {
            return unknown_entity(entity_name, "action");
        };
        if entity.find_action(action_name).is_none() {
            return RenderContext::failure(
                "action",
                entity_name,
                404,
                format!("unknown action '{}'", action_name),
            );
        }
        let Some(handler) = self.actions.get(action_name) else {
            return RenderContext::failure(
                "action",
                entity_name,
                501,
                format!("no handler registered for action '{}'", action_name),
            );
        };
        match handler.run(entity, payload).await {
            Ok(result) => {
                let mut ctx = RenderContext::success("action", entity_name);
                ctx.result = Some(result);
                ctx
            }
            Err(ActionError::Repo(e)) => repo_failure("action", entity_name, e),
            Err(e) => {
                tracing::error!(entity = entity_name, action = action_name, error = %e, "action handler failed");
                RenderContext::failure("action", entity_name, 500, GENERIC_INTERNAL.to_string())
            }
        }
    }
}

const GENERIC_INTERNAL: &str = "internal error";
const GENERIC_UNAVAILABLE: &str = "service temporarily unavailable";

fn unknown_entity(entity_name: &str, mode: &'static str) -> RenderContext {
    RenderContext::failure(
        mode,
        entity_name,
        404,
        format!("unknown entity '{}'", entity_name),
    )
}

/// Map a repository failure onto a status. Not-found and validation messages
/// are safe to surface; transient and internal failures are logged and
/// replaced with a generic message.
fn repo_failure(mode: &'static str, entity_name: &str, e: RepoError) -> RenderContext {
    match &e {
        RepoError::RecordNotFound { .. } => {
            RenderContext::failure(mode, entity_name, 404, e.to_string())
        }
        RepoError::NoFieldsToSave => RenderContext::failure(mode, entity_name, 400, e.to_string()),
        _ if e.is_transient() => {
            tracing::error!(entity = entity_name, error = %e, "transient database failure");
            RenderContext::failure(mode, entity_name, 503, GENERIC_UNAVAILABLE.to_string())
        }
        _ => {
            tracing::error!(entity = entity_name, error = %e, "repository failure");
            RenderContext::failure(mode, entity_name, 500, GENERIC_INTERNAL.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_entities, EntityConfig};
    use crate::error::RepoError;
    use crate::service::actions::ActionHandler;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    const YAML: &str = r#"
customer:
  table: customers
  label: Customer
  list:
    columns:
      - { name: name, label: Name }
      - { name: email, label: Email }
    default_sort: name
    page_size: 2
    actions:
      - { name: export_csv, label: Export CSV }
  form:
    sections:
      - label: Main
        fields:
          - { name: name, label: Name, required: true }
          - { name: email, label: Email, type: email, required: true }
    actions:
      - { name: send_welcome, label: Send welcome mail }
"#;

    fn registry() -> Arc<EntityRegistry> {
        Arc::new(parse_entities(YAML).unwrap())
    }

    fn record(v: serde_json::Value) -> Record {
        v.as_object().unwrap().clone()
    }

    /// What the mock should do for any repo call.
    #[derive(Clone, Copy)]
    enum Behavior {
        Normal,
        NotFound,
        PoolTimeout,
        Broken,
    }

    struct MockRepo {
        behavior: Behavior,
        rows: Vec<Record>,
        detail: Option<Record>,
        save_called: AtomicBool,
    }

    impl MockRepo {
        fn new(behavior: Behavior) -> Self {
            MockRepo {
                behavior,
                rows: vec![
                    record(json!({"id": 3, "name": "Charlie", "email": "c@x.io"})),
                    record(json!({"id": 2, "name": "Bob", "email": "b@x.io"})),
                ],
                detail: Some(record(json!({"id": 1, "name": "Alice", "email": "a@x.io"}))),
                save_called: AtomicBool::new(false),
            }
        }

        fn fail(&self) -> Option<RepoError> {
            match self.behavior {
                Behavior::Normal => None,
                Behavior::NotFound => Some(RepoError::RecordNotFound {
                    pk_name: "id".into(),
                    pk: json!(999),
                }),
                Behavior::PoolTimeout => Some(RepoError::Db(sqlx::Error::PoolTimedOut)),
                Behavior::Broken => Some(RepoError::Db(sqlx::Error::RowNotFound)),
            }
        }
    }

    #[async_trait]
    impl EntityRepo for MockRepo {
        async fn fetch_list(
            &self,
            _entity: &EntityConfig,
            _page: i64,
            _page_size: Option<u32>,
            _sort: Option<&str>,
        ) -> Result<Vec<Record>, RepoError> {
            match self.fail() {
                Some(e) => Err(e),
                None => Ok(self.rows.clone()),
            }
        }

        async fn fetch_detail(
            &self,
            _entity: &EntityConfig,
            _pk: &Value,
        ) -> Result<Option<Record>, RepoError> {
            match self.fail() {
                Some(RepoError::RecordNotFound { .. }) => Ok(None),
                Some(e) => Err(e),
                None => Ok(self.detail.clone()),
            }
        }

        async fn search_lookup(
            &self,
            _entity: &EntityConfig,
            _query: &str,
            limit: u32,
        ) -> Result<Vec<Record>, RepoError> {
            match self.fail() {
                Some(e) => Err(e),
                None => Ok(self.rows.iter().take(limit as usize).cloned().collect()),
            }
        }

        async fn save(&self, _entity: &EntityConfig, payload: &Record) -> Result<Record, RepoError> {
            self.save_called.store(true, Ordering::SeqCst);
            match self.fail() {
                Some(e) => Err(e),
                None => {
                    let mut saved = payload.clone();
                    saved.entry("id".to_string()).or_insert(json!(1));
                    Ok(saved)
                }
            }
        }
    }

    struct EchoAction;

    #[async_trait]
    impl ActionHandler for EchoAction {
        async fn run(&self, entity: &EntityConfig, payload: &Record) -> Result<Value, ActionError> {
            Ok(json!({"entity": entity.name, "count": payload.len()}))
        }
    }

    struct FailingAction;

    #[async_trait]
    impl ActionHandler for FailingAction {
        async fn run(&self, _entity: &EntityConfig, _payload: &Record) -> Result<Value, ActionError> {
            Err(ActionError::Failed("boom with secret detail".into()))
        }
    }

    fn service(behavior: Behavior) -> GenericService<MockRepo> {
        GenericService::new(
            registry(),
            MockRepo::new(behavior),
            Arc::new(ActionRegistry::new()),
        )
    }

    fn service_with_actions(
        behavior: Behavior,
        register: &[(&str, Arc<dyn ActionHandler>)],
    ) -> GenericService<MockRepo> {
        let mut actions = ActionRegistry::new();
        for (name, handler) in register {
            actions.register(*name, handler.clone());
        }
        GenericService::new(registry(), MockRepo::new(behavior), Arc::new(actions))
    }

    #[tokio::test]
    async fn render_list_unknown_entity_is_404() {
        let ctx = service(Behavior::Normal).render_list("widget", 1, None, None).await;
        assert!(!ctx.ok);
        assert_eq!(ctx.status, 404);
        assert!(ctx.error.unwrap().contains("widget"));
    }

    #[tokio::test]
    async fn render_list_success_carries_list_config() {
        let ctx = service(Behavior::Normal)
            .render_list("customer", 0, None, Some("-name"))
            .await;
        assert!(ctx.ok);
        assert_eq!(ctx.status, 200);
        assert_eq!(ctx.mode, "list");
        let rows = ctx.rows.unwrap();
        assert_eq!(rows[0]["name"], json!("Charlie"));
        assert_eq!(rows[1]["name"], json!("Bob"));
        assert_eq!(ctx.page, Some(1));
        assert_eq!(ctx.page_size, Some(2));
        assert_eq!(ctx.sort.as_deref(), Some("-name"));
        assert_eq!(ctx.columns.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn render_list_falls_back_to_default_sort() {
        let ctx = service(Behavior::Normal).render_list("customer", 1, None, None).await;
        assert_eq!(ctx.sort.as_deref(), Some("name"));
    }

    #[tokio::test]
    async fn pool_timeout_becomes_generic_503() {
        let ctx = service(Behavior::PoolTimeout)
            .render_list("customer", 1, None, None)
            .await;
        assert_eq!(ctx.status, 503);
        let msg = ctx.error.unwrap();
        assert!(!msg.contains("pool"), "driver detail leaked: {}", msg);
    }

    #[tokio::test]
    async fn other_db_error_becomes_generic_500() {
        let ctx = service(Behavior::Broken).render_list("customer", 1, None, None).await;
        assert_eq!(ctx.status, 500);
        assert_eq!(ctx.error.as_deref(), Some("internal error"));
    }

    #[tokio::test]
    async fn render_detail_found_and_missing() {
        let ctx = service(Behavior::Normal).render_detail("customer", &json!(1)).await;
        assert!(ctx.ok);
        assert_eq!(ctx.mode, "view");
        assert_eq!(ctx.record.unwrap()["name"], json!("Alice"));
        assert_eq!(ctx.actions.unwrap()[0].name, "send_welcome");

        let ctx = service(Behavior::NotFound).render_detail("customer", &json!(9)).await;
        assert_eq!(ctx.status, 404);
        assert!(ctx.record.is_none());
    }

    #[tokio::test]
    async fn render_form_create_and_edit_modes() {
        let svc = service(Behavior::Normal);
        let ctx = svc.render_form("customer", None).await;
        assert!(ctx.ok);
        assert_eq!(ctx.mode, "create");
        assert!(ctx.record.is_none());
        assert!(ctx.form.is_some());

        let ctx = svc.render_form("customer", Some(&json!(1))).await;
        assert_eq!(ctx.mode, "edit");
        assert!(ctx.record.is_some());

        let ctx = service(Behavior::NotFound).render_form("customer", Some(&json!(9))).await;
        assert_eq!(ctx.status, 404);
    }

    #[tokio::test]
    async fn handle_save_empty_payload_reports_all_fields_without_repo() {
        let svc = service(Behavior::Normal);
        let ctx = svc.handle_save("customer", &Record::new()).await;
        assert_eq!(ctx.status, 400);
        let errors = ctx.errors.unwrap();
        assert!(errors.contains_key("name"));
        assert!(errors.contains_key("email"));
        assert!(ctx.form.is_some());
        assert!(!svc.repo.save_called.load(Ordering::SeqCst), "repo touched on validation failure");
    }

    #[tokio::test]
    async fn handle_save_success_returns_view_context() {
        let svc = service(Behavior::Normal);
        let payload = record(json!({"name": "Dana", "email": "d@x.io"}));
        let ctx = svc.handle_save("customer", &payload).await;
        assert!(ctx.ok);
        assert_eq!(ctx.mode, "view");
        let saved = ctx.record.unwrap();
        assert_eq!(saved["name"], json!("Dana"));
        assert!(saved.contains_key("id"));
    }

    #[tokio::test]
    async fn handle_save_missing_update_target_is_404() {
        let svc = service(Behavior::NotFound);
        let payload = record(json!({"id": 999, "name": "Ghost", "email": "g@x.io"}));
        let ctx = svc.handle_save("customer", &payload).await;
        assert_eq!(ctx.status, 404);
        assert!(svc.repo.save_called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn handle_save_transient_failure_is_503() {
        let payload = record(json!({"name": "Dana", "email": "d@x.io"}));
        let ctx = service(Behavior::PoolTimeout).handle_save("customer", &payload).await;
        assert_eq!(ctx.status, 503);
    }

    #[tokio::test]
    async fn handle_lookup_caps_rows() {
        let ctx = service(Behavior::Normal)
            .handle_lookup("customer", "", Some(1))
            .await;
        assert!(ctx.ok);
        assert_eq!(ctx.rows.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn handle_action_unknown_action_is_404() {
        let ctx = service(Behavior::Normal)
            .handle_action("customer", "does_not_exist", &Record::new())
            .await;
        assert_eq!(ctx.status, 404);
    }

    #[tokio::test]
    async fn declared_action_without_handler_is_501() {
        let ctx = service(Behavior::Normal)
            .handle_action("customer", "export_csv", &Record::new())
            .await;
        assert_eq!(ctx.status, 501);
    }

    #[tokio::test]
    async fn registered_action_runs_and_returns_result() {
        let svc = service_with_actions(
            Behavior::Normal,
            &[("export_csv", Arc::new(EchoAction) as Arc<dyn ActionHandler>)],
        );
        let payload = record(json!({"ids": [1, 2]}));
        let ctx = svc.handle_action("customer", "export_csv", &payload).await;
        assert!(ctx.ok);
        assert_eq!(ctx.result.unwrap()["entity"], json!("customer"));
    }

    #[tokio::test]
    async fn action_handler_failure_is_generic_500() {
        let svc = service_with_actions(
            Behavior::Normal,
            &[("send_welcome", Arc::new(FailingAction) as Arc<dyn ActionHandler>)],
        );
        let ctx = svc.handle_action("customer", "send_welcome", &Record::new()).await;
        assert_eq!(ctx.status, 500);
        assert!(!ctx.error.unwrap().contains("secret"));
    }
}
