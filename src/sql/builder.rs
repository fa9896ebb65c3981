//! Builds parameterized SELECT, INSERT, and UPDATE statements from an entity
//! schema. Identifiers are validated before interpolation; every value is
//! bound as a `$n` parameter.

use crate::config::EntityConfig;
use crate::error::RepoError;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

static IDENT_RE: OnceLock<Regex> = OnceLock::new();

fn ident_re() -> &'static Regex {
    IDENT_RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex"))
}

/// True when `name` is syntactically a plain SQL identifier.
pub fn is_identifier(name: &str) -> bool {
    ident_re().is_match(name)
}

/// Validate an identifier before it may be interpolated into SQL text.
pub fn safe_identifier(name: &str) -> Result<&str, RepoError> {
    if is_identifier(name) {
        Ok(name)
    } else {
        Err(RepoError::UnsafeIdentifier(name.to_string()))
    }
}

/// Quote a pre-validated identifier for PostgreSQL.
fn quoted(name: &str) -> String {
    format!("\"{}\"", name)
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// Columns selected for list/detail/lookup: primary key first, then list
/// columns, de-duplicated with order preserved.
pub fn select_columns(entity: &EntityConfig) -> Vec<&str> {
    let mut cols: Vec<&str> = vec![entity.primary_key.as_str()];
    for col in &entity.list.columns {
        if !cols.contains(&col.name.as_str()) {
            cols.push(&col.name);
        }
    }
    cols
}

/// Field names `save` may persist: primary key plus every declared form
/// field. Payload keys outside this set never reach SQL.
pub fn allowed_fields(entity: &EntityConfig) -> Vec<&str> {
    let mut fields: Vec<&str> = vec![entity.primary_key.as_str()];
    for field in entity.form_fields() {
        if !fields.contains(&field.name.as_str()) {
            fields.push(&field.name);
        }
    }
    fields
}

/// Drop payload keys outside the entity's save whitelist.
pub fn filter_payload(entity: &EntityConfig, payload: &Map<String, Value>) -> Map<String, Value> {
    let allowed = allowed_fields(entity);
    let mut out = Map::new();
    for name in allowed {
        if let Some(v) = payload.get(name) {
            out.insert(name.to_string(), v.clone());
        }
    }
    out
}

/// A primary-key value that selects update-mode in `save`:
/// null, empty string, zero, and false all mean "no key".
pub fn is_truthy_pk(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    fn as_sql(self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

/// Resolve a requested sort against the selected columns. A leading `-`
/// means descending. Unknown columns degrade silently: first to
/// `default_sort`, then to the first selected column, direction reset to
/// ascending.
pub fn resolve_sort<'a>(
    sort: Option<&'a str>,
    columns: &[&'a str],
    default_sort: Option<&'a str>,
) -> (&'a str, SortDir) {
    let requested = sort.or(default_sort).unwrap_or(columns[0]);
    let (col, dir) = match requested.strip_prefix('-') {
        Some(rest) => (rest, SortDir::Desc),
        None => (requested, SortDir::Asc),
    };
    if columns.contains(&col) {
        return (col, dir);
    }
    let fallback = default_sort
        .map(|d| d.strip_prefix('-').unwrap_or(d))
        .filter(|d| columns.contains(d))
        .unwrap_or(columns[0]);
    (fallback, SortDir::Asc)
}

/// One paginated SELECT: ORDER BY resolved sort, LIMIT/OFFSET as parameters.
/// `page` is 1-indexed and clamped to a minimum of 1.
pub fn select_list(
    entity: &EntityConfig,
    page: i64,
    page_size: Option<u32>,
    sort: Option<&str>,
) -> Result<QueryBuf, RepoError> {
    let mut q = QueryBuf::new();
    let table = safe_identifier(&entity.table)?;
    let columns = select_columns(entity);
    for c in &columns {
        safe_identifier(c)?;
    }
    let (sort_col, dir) = resolve_sort(sort, &columns, entity.list.default_sort.as_deref());

    let page = page.max(1);
    let effective_page_size = i64::from(page_size.unwrap_or(entity.list.page_size).max(1));
    let offset = (page - 1) * effective_page_size;

    let limit_param = q.push_param(Value::from(effective_page_size));
    let offset_param = q.push_param(Value::from(offset));
    let col_list = columns.iter().map(|c| quoted(c)).collect::<Vec<_>>().join(", ");
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY {} {} LIMIT ${} OFFSET ${}",
        col_list,
        quoted(table),
        quoted(sort_col),
        dir.as_sql(),
        limit_param,
        offset_param
    );
    Ok(q)
}

/// SELECT the same column set filtered by primary key.
pub fn select_by_pk(entity: &EntityConfig, pk: &Value) -> Result<QueryBuf, RepoError> {
    let mut q = QueryBuf::new();
    let table = safe_identifier(&entity.table)?;
    let pk_name = safe_identifier(&entity.primary_key)?;
    let columns = select_columns(entity);
    for c in &columns {
        safe_identifier(c)?;
    }
    let pk_param = q.push_param(pk.clone());
    let col_list = columns.iter().map(|c| quoted(c)).collect::<Vec<_>>().join(", ");
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = ${}",
        col_list,
        quoted(table),
        quoted(pk_name),
        pk_param
    );
    Ok(q)
}

/// Lookup query for modal search: key column is the first selected column,
/// display is the second. With fewer than two columns the single column
/// doubles as both (degenerate config fallback, kept for compatibility).
pub fn select_lookup(entity: &EntityConfig, query: &str, limit: u32) -> Result<QueryBuf, RepoError> {
    let mut q = QueryBuf::new();
    let table = safe_identifier(&entity.table)?;
    let columns = select_columns(entity);
    let pk_col = safe_identifier(columns[0])?;
    let display_col = safe_identifier(columns.get(1).copied().unwrap_or(columns[0]))?;

    let pattern = format!("%{}%", query);
    let like_param = q.push_param(Value::String(pattern));
    let limit_param = q.push_param(Value::from(i64::from(limit)));

    let col_list = if pk_col == display_col {
        quoted(pk_col)
    } else {
        format!("{}, {}", quoted(pk_col), quoted(display_col))
    };
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} LIKE ${} ORDER BY {} ASC LIMIT ${}",
        col_list,
        quoted(table),
        quoted(display_col),
        like_param,
        quoted(display_col),
        limit_param
    );
    Ok(q)
}

/// INSERT from an already-whitelisted payload. The primary key is omitted
/// unless it carries a truthy value; the generated key is read back via
/// RETURNING.
pub fn insert(entity: &EntityConfig, payload: &Map<String, Value>) -> Result<QueryBuf, RepoError> {
    let mut q = QueryBuf::new();
    let table = safe_identifier(&entity.table)?;
    let pk_name = safe_identifier(&entity.primary_key)?;

    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for name in allowed_fields(entity) {
        let Some(v) = payload.get(name) else { continue };
        if name == pk_name && !is_truthy_pk(v) {
            continue;
        }
        safe_identifier(name)?;
        let n = q.push_param(v.clone());
        cols.push(quoted(name));
        placeholders.push(format!("${}", n));
    }
    if cols.is_empty() {
        return Err(RepoError::NoFieldsToSave);
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        quoted(table),
        cols.join(", "),
        placeholders.join(", "),
        quoted(pk_name)
    );
    Ok(q)
}

/// UPDATE by primary key: SET every present whitelisted non-pk field.
pub fn update(
    entity: &EntityConfig,
    pk: &Value,
    payload: &Map<String, Value>,
) -> Result<QueryBuf, RepoError> {
    let mut q = QueryBuf::new();
    let table = safe_identifier(&entity.table)?;
    let pk_name = safe_identifier(&entity.primary_key)?;

    let mut sets = Vec::new();
    for name in allowed_fields(entity) {
        if name == pk_name {
            continue;
        }
        let Some(v) = payload.get(name) else { continue };
        safe_identifier(name)?;
        let n = q.push_param(v.clone());
        sets.push(format!("{} = ${}", quoted(name), n));
    }
    if sets.is_empty() {
        return Err(RepoError::NoFieldsToSave);
    }
    let pk_param = q.push_param(pk.clone());
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ${}",
        quoted(table),
        sets.join(", "),
        quoted(pk_name),
        pk_param
    );
    Ok(q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_entities;
    use crate::config::EntityConfig;
    use serde_json::json;

    fn customer() -> EntityConfig {
        let yaml = r#"
customer:
  table: customers
  label: Customer
  list:
    columns:
      - { name: name, label: Name }
      - { name: email, label: Email }
    default_sort: name
    page_size: 2
  form:
    sections:
      - label: Main
        fields:
          - { name: name, label: Name, required: true }
          - { name: email, label: Email, type: email, required: true }
"#;
        parse_entities(yaml).unwrap().get("customer").unwrap().clone()
    }

    fn payload(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn injection_attempt_rejected_before_sql() {
        let err = safe_identifier("a;DROP TABLE").unwrap_err();
        assert!(matches!(err, RepoError::UnsafeIdentifier(_)));
        assert!(safe_identifier("_valid_name2").is_ok());
        assert!(safe_identifier("").is_err());
        assert!(safe_identifier("1starts_with_digit").is_err());
    }

    #[test]
    fn select_columns_pk_first_deduplicated() {
        let mut entity = customer();
        entity.list.columns.push(crate::config::ColumnSpec {
            name: "id".into(),
            label: "Id".into(),
            width: None,
            sortable: None,
        });
        assert_eq!(select_columns(&entity), vec!["id", "name", "email"]);
    }

    #[test]
    fn resolve_sort_handles_descending_and_fallbacks() {
        let cols = vec!["id", "name", "email"];
        assert_eq!(resolve_sort(Some("-name"), &cols, Some("name")), ("name", SortDir::Desc));
        assert_eq!(resolve_sort(Some("email"), &cols, Some("name")), ("email", SortDir::Asc));
        // Unknown column: default sort wins, direction resets to ascending.
        assert_eq!(resolve_sort(Some("-bogus"), &cols, Some("name")), ("name", SortDir::Asc));
        // Unknown column and unknown default: first selected column.
        assert_eq!(resolve_sort(Some("bogus"), &cols, Some("gone")), ("id", SortDir::Asc));
        // No sort at all: default, then first column.
        assert_eq!(resolve_sort(None, &cols, Some("-email")), ("email", SortDir::Desc));
        assert_eq!(resolve_sort(None, &cols, None), ("id", SortDir::Asc));
    }

    #[test]
    fn list_scenario_sorts_descending_with_bound_page() {
        let q = select_list(&customer(), 1, Some(2), Some("-name")).unwrap();
        assert_eq!(
            q.sql,
            "SELECT \"id\", \"name\", \"email\" FROM \"customers\" ORDER BY \"name\" DESC LIMIT $1 OFFSET $2"
        );
        assert_eq!(q.params, vec![json!(2), json!(0)]);
    }

    #[test]
    fn nonpositive_page_behaves_like_page_one() {
        let entity = customer();
        let base = select_list(&entity, 1, None, None).unwrap();
        for page in [0, -1, -100] {
            let q = select_list(&entity, page, None, None).unwrap();
            assert_eq!(q.sql, base.sql);
            assert_eq!(q.params, base.params);
        }
        let q = select_list(&entity, 3, Some(10), None).unwrap();
        assert_eq!(q.params, vec![json!(10), json!(20)]);
    }

    #[test]
    fn select_by_pk_binds_key() {
        let q = select_by_pk(&customer(), &json!(7)).unwrap();
        assert_eq!(
            q.sql,
            "SELECT \"id\", \"name\", \"email\" FROM \"customers\" WHERE \"id\" = $1"
        );
        assert_eq!(q.params, vec![json!(7)]);
    }

    #[test]
    fn lookup_uses_second_column_for_display() {
        let q = select_lookup(&customer(), "ali", 10).unwrap();
        assert_eq!(
            q.sql,
            "SELECT \"id\", \"name\" FROM \"customers\" WHERE \"name\" LIKE $1 ORDER BY \"name\" ASC LIMIT $2"
        );
        assert_eq!(q.params, vec![json!("%ali%"), json!(10)]);
    }

    #[test]
    fn lookup_empty_query_matches_all_and_limit_zero_is_bound() {
        let q = select_lookup(&customer(), "", 0).unwrap();
        assert_eq!(q.params, vec![json!("%%"), json!(0)]);
    }

    #[test]
    fn lookup_single_column_doubles_as_display() {
        let yaml = r#"
tag:
  table: tags
  label: Tag
  list:
    columns: [{ name: id, label: Id }]
  form:
    sections: []
"#;
        let entity = parse_entities(yaml).unwrap().get("tag").unwrap().clone();
        let q = select_lookup(&entity, "x", 5).unwrap();
        assert_eq!(
            q.sql,
            "SELECT \"id\" FROM \"tags\" WHERE \"id\" LIKE $1 ORDER BY \"id\" ASC LIMIT $2"
        );
    }

    #[test]
    fn insert_omits_falsy_pk_and_returns_key() {
        let body = payload(json!({"id": 0, "name": "Alice", "email": "a@x.io"}));
        let q = insert(&customer(), &body).unwrap();
        assert_eq!(
            q.sql,
            "INSERT INTO \"customers\" (\"name\", \"email\") VALUES ($1, $2) RETURNING \"id\""
        );
        assert_eq!(q.params, vec![json!("Alice"), json!("a@x.io")]);
    }

    #[test]
    fn insert_keeps_explicit_pk() {
        let body = payload(json!({"id": 42, "name": "Alice"}));
        let q = insert(&customer(), &body).unwrap();
        assert!(q.sql.starts_with("INSERT INTO \"customers\" (\"id\", \"name\")"));
        assert_eq!(q.params[0], json!(42));
    }

    #[test]
    fn insert_with_nothing_to_persist_fails() {
        let body = payload(json!({"id": ""}));
        assert!(matches!(
            insert(&customer(), &body).unwrap_err(),
            RepoError::NoFieldsToSave
        ));
    }

    #[test]
    fn update_sets_present_fields_only() {
        let body = payload(json!({"name": "Bob"}));
        let q = update(&customer(), &json!(5), &body).unwrap();
        assert_eq!(
            q.sql,
            "UPDATE \"customers\" SET \"name\" = $1 WHERE \"id\" = $2"
        );
        assert_eq!(q.params, vec![json!("Bob"), json!(5)]);
    }

    #[test]
    fn filter_payload_drops_unlisted_keys() {
        let body = payload(json!({
            "name": "Alice",
            "email": "a@x.io",
            "is_admin": true,
            "name; DROP TABLE customers": "x"
        }));
        let filtered = filter_payload(&customer(), &body);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.contains_key("name"));
        assert!(filtered.contains_key("email"));
        assert!(!filtered.contains_key("is_admin"));
    }

    #[test]
    fn truthy_pk_rules() {
        assert!(!is_truthy_pk(&Value::Null));
        assert!(!is_truthy_pk(&json!("")));
        assert!(!is_truthy_pk(&json!(0)));
        assert!(!is_truthy_pk(&json!(false)));
        assert!(is_truthy_pk(&json!(1)));
        assert!(is_truthy_pk(&json!("abc")));
    }
}
