//! Generic repository: entity-schema-driven data access over PostgreSQL.
//!
//! No entity-specific code paths; every statement is built by the `sql`
//! module from the entity's validated config. Each call holds one pool
//! connection for its duration; `save` scopes a transaction to it.

use crate::config::EntityConfig;
use crate::error::RepoError;
use crate::sql::{self, PgBindValue, QueryBuf};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::PgPool;

/// One row, keyed by column name in the entity's declared column order.
pub type Record = Map<String, Value>;

/// Data-access seam the service depends on. The PostgreSQL implementation
/// is [`GenericRepo`]; tests substitute an in-memory one.
#[async_trait]
pub trait EntityRepo: Send + Sync {
    async fn fetch_list(
        &self,
        entity: &EntityConfig,
        page: i64,
        page_size: Option<u32>,
        sort: Option<&str>,
    ) -> Result<Vec<Record>, RepoError>;

    async fn fetch_detail(
        &self,
        entity: &EntityConfig,
        pk: &Value,
    ) -> Result<Option<Record>, RepoError>;

    async fn search_lookup(
        &self,
        entity: &EntityConfig,
        query: &str,
        limit: u32,
    ) -> Result<Vec<Record>, RepoError>;

    async fn save(&self, entity: &EntityConfig, payload: &Record) -> Result<Record, RepoError>;
}

#[derive(Clone)]
pub struct GenericRepo {
    pool: PgPool,
}

impl GenericRepo {
    pub fn new(pool: PgPool) -> Self {
        GenericRepo { pool }
    }

    async fn query_many(&self, q: &QueryBuf) -> Result<Vec<Record>, RepoError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn query_opt(&self, q: &QueryBuf) -> Result<Option<Record>, RepoError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let row = query.fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(row_to_record))
    }
}

#[async_trait]
impl EntityRepo for GenericRepo {
    async fn fetch_list(
        &self,
        entity: &EntityConfig,
        page: i64,
        page_size: Option<u32>,
        sort: Option<&str>,
    ) -> Result<Vec<Record>, RepoError> {
        let q = sql::select_list(entity, page, page_size, sort)?;
        self.query_many(&q).await
    }

    async fn fetch_detail(
        &self,
        entity: &EntityConfig,
        pk: &Value,
    ) -> Result<Option<Record>, RepoError> {
        let q = sql::select_by_pk(entity, pk)?;
        self.query_opt(&q).await
    }

    async fn search_lookup(
        &self,
        entity: &EntityConfig,
        query: &str,
        limit: u32,
    ) -> Result<Vec<Record>, RepoError> {
        let q = sql::select_lookup(entity, query, limit)?;
        self.query_many(&q).await
    }

    /// Insert or update depending on a truthy primary-key value in the
    /// payload. The payload is filtered to the save whitelist before any
    /// SQL; the write runs in one transaction that rolls back on every
    /// error path.
    async fn save(&self, entity: &EntityConfig, payload: &Record) -> Result<Record, RepoError> {
        let filtered = sql::filter_payload(entity, payload);
        let pk_name = entity.primary_key.as_str();
        let pk_value = filtered.get(pk_name).filter(|v| sql::is_truthy_pk(v)).cloned();

        match pk_value {
            Some(pk) => {
                let q = match sql::update(entity, &pk, &filtered) {
                    Ok(q) => q,
                    // Only the key was supplied: nothing to set, return the row as-is.
                    Err(RepoError::NoFieldsToSave) => {
                        return self.fetch_detail(entity, &pk).await?.ok_or_else(|| {
                            RepoError::RecordNotFound {
                                pk_name: pk_name.to_string(),
                                pk,
                            }
                        });
                    }
                    Err(e) => return Err(e),
                };
                let mut tx = self.pool.begin().await?;
                tracing::debug!(sql = %q.sql, params = ?q.params, "query (tx)");
                let mut query = sqlx::query(&q.sql);
                for p in &q.params {
                    query = query.bind(PgBindValue::from_json(p));
                }
                let result = query.execute(&mut *tx).await?;
                if result.rows_affected() == 0 {
                    tx.rollback().await?;
                    return Err(RepoError::RecordNotFound {
                        pk_name: pk_name.to_string(),
                        pk,
                    });
                }
                tx.commit().await?;
                self.fetch_detail(entity, &pk)
                    .await?
                    .ok_or_else(|| RepoError::RecordNotFound {
                        pk_name: pk_name.to_string(),
                        pk,
                    })
            }
            None => {
                let q = sql::insert(entity, &filtered)?;
                let mut tx = self.pool.begin().await?;
                tracing::debug!(sql = %q.sql, params = ?q.params, "query (tx)");
                let mut query = sqlx::query(&q.sql);
                for p in &q.params {
                    query = query.bind(PgBindValue::from_json(p));
                }
                let row = query.fetch_one(&mut *tx).await?;
                tx.commit().await?;

                let mut saved = filtered;
                let generated = row_to_record(&row);
                if let Some(new_pk) = generated.get(pk_name) {
                    saved.insert(pk_name.to_string(), new_pk.clone());
                }
                Ok(saved)
            }
        }
    }
}

fn row_to_record(row: &PgRow) -> Record {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = Record::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    map
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<serde_json::Value>, _>(name) {
        return j;
    }
    Value::Null
}
