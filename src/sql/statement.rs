//! Statement Builder
//!
//! One builder per CRUD verb. Each validates every referenced column
//! against the schema before emitting any text, then produces SQL with
//! `{name:Type}` placeholders and the matching bound parameters.
//!
//! Mutations use ClickHouse's asynchronous `ALTER TABLE ... UPDATE/DELETE`
//! forms; the statement returns once the mutation is queued, not applied.

use super::predicate::{build_filter_clause, QueryDirectives};
use super::{placeholder, BoundParams, BuildError, ColumnRole, Statement};
use crate::model::{FilterSet, MutationPayload};
use crate::schema::{coerce, ColumnDescriptor, NativeValue, TableSchema};

/// An aggregate `SELECT` and the names of its output columns, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateStatement {
    pub statement: Statement,
    pub columns: Vec<String>,
}

fn check_payload(schema: &TableSchema, payload: &MutationPayload) -> Result<(), BuildError> {
    let unknown = schema.unknown_columns(payload.keys().map(String::as_str));
    if !unknown.is_empty() {
        return Err(BuildError::unknown(ColumnRole::Payload, unknown));
    }
    if payload.is_empty() {
        return Err(BuildError::EmptyPayload);
    }
    Ok(())
}

fn check_filters(schema: &TableSchema, filters: &FilterSet) -> Result<(), BuildError> {
    let unknown = schema.unknown_columns(filters.keys());
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(BuildError::unknown(ColumnRole::Filter, unknown))
    }
}

fn key_column<'a>(schema: &'a TableSchema, key: &str) -> Result<&'a ColumnDescriptor, BuildError> {
    schema
        .column(key)
        .ok_or_else(|| BuildError::unknown(ColumnRole::Key, vec![key.to_string()]))
}

/// `key={key:Type}` with the coerced key bound under `param`.
fn key_condition(
    column: &ColumnDescriptor,
    param: &str,
    raw_value: &str,
    params: &mut BoundParams,
) -> String {
    params.bind(param, coerce(raw_value, column));
    format!("{}={}", column.name, placeholder(param, &column.declared_type))
}

/// `INSERT INTO table (cols...) VALUES ({col:Type}, ...)`
pub fn build_insert(
    table: &str,
    schema: &TableSchema,
    payload: &MutationPayload,
) -> Result<Statement, BuildError> {
    check_payload(schema, payload)?;

    let mut cols = Vec::with_capacity(payload.len());
    let mut placeholders = Vec::with_capacity(payload.len());
    let mut params = BoundParams::new();
    for (name, value) in payload {
        let declared = schema.declared_type(name).unwrap_or_default();
        cols.push(name.as_str());
        placeholders.push(placeholder(name, declared));
        params.bind(name.as_str(), NativeValue::Json(value.clone()));
    }

    Ok(Statement {
        sql: format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            cols.join(", "),
            placeholders.join(", ")
        ),
        params,
    })
}

/// `SELECT * FROM table [WHERE col={col:Type} AND ...]`
pub fn build_select(
    table: &str,
    schema: &TableSchema,
    filters: &FilterSet,
) -> Result<Statement, BuildError> {
    check_filters(schema, filters)?;
    let clause = build_filter_clause(filters, schema)?;
    Ok(Statement {
        sql: format!("SELECT * FROM {table}{}", clause.where_sql()),
        params: clause.params,
    })
}

/// `SELECT * FROM table WHERE key={key:Type}`
pub fn build_select_by_key(
    table: &str,
    schema: &TableSchema,
    key: &str,
    key_value: &str,
) -> Result<Statement, BuildError> {
    let column = key_column(schema, key)?;
    let mut params = BoundParams::new();
    let condition = key_condition(column, key, key_value, &mut params);
    Ok(Statement {
        sql: format!("SELECT * FROM {table} WHERE {condition}"),
        params,
    })
}

/// `SELECT count() FROM table WHERE key={key:Type}`, the existence check
/// run before keyed mutations.
pub fn build_count_by_key(
    table: &str,
    schema: &TableSchema,
    key: &str,
    key_value: &str,
) -> Result<Statement, BuildError> {
    let column = key_column(schema, key)?;
    let mut params = BoundParams::new();
    let condition = key_condition(column, key, key_value, &mut params);
    Ok(Statement {
        sql: format!("SELECT count() FROM {table} WHERE {condition}"),
        params,
    })
}

/// `ALTER TABLE table UPDATE col={col:Type}, ... WHERE key={key:Type}`
///
/// When the payload also sets the key column, the key parameter is bound
/// under a distinct name so the new value and the lookup value do not
/// collide.
pub fn build_update(
    table: &str,
    schema: &TableSchema,
    key: &str,
    key_value: &str,
    payload: &MutationPayload,
) -> Result<Statement, BuildError> {
    let column = key_column(schema, key)?;
    check_payload(schema, payload)?;

    let mut params = BoundParams::new();
    let mut assignments = Vec::with_capacity(payload.len());
    for (name, value) in payload {
        let declared = schema.declared_type(name).unwrap_or_default();
        assignments.push(format!("{name}={}", placeholder(name, declared)));
        params.bind(name.as_str(), NativeValue::Json(value.clone()));
    }

    let mut key_param = key.to_string();
    while payload.contains_key(&key_param) {
        key_param = format!("__{key_param}");
    }
    let condition = key_condition(column, &key_param, key_value, &mut params);

    Ok(Statement {
        sql: format!(
            "ALTER TABLE {table} UPDATE {} WHERE {condition}",
            assignments.join(", ")
        ),
        params,
    })
}

/// `ALTER TABLE table DELETE WHERE key={key:Type}`
pub fn build_delete(
    table: &str,
    schema: &TableSchema,
    key: &str,
    key_value: &str,
) -> Result<Statement, BuildError> {
    let column = key_column(schema, key)?;
    let mut params = BoundParams::new();
    let condition = key_condition(column, key, key_value, &mut params);
    Ok(Statement {
        sql: format!("ALTER TABLE {table} DELETE WHERE {condition}"),
        params,
    })
}

/// `SELECT FUNC(col) AS func_col, groupcols... FROM table [WHERE ...] [GROUP BY groupcols]`
pub fn build_aggregate_select(
    table: &str,
    schema: &TableSchema,
    directives: &QueryDirectives,
    filters: &FilterSet,
) -> Result<AggregateStatement, BuildError> {
    check_filters(schema, filters)?;
    directives.validate(schema)?;

    let mut select = Vec::with_capacity(directives.group_by.len() + 1);
    let mut columns = Vec::with_capacity(directives.group_by.len() + 1);
    if let Some(agg) = &directives.aggregate {
        let alias = agg.alias();
        select.push(format!("{}({}) AS {alias}", agg.function.sql_name(), agg.column));
        columns.push(alias);
    }
    for col in &directives.group_by {
        select.push(col.clone());
        columns.push(col.clone());
    }

    let clause = build_filter_clause(filters, schema)?;
    let mut sql = format!("SELECT {} FROM {table}{}", select.join(", "), clause.where_sql());
    if !directives.group_by.is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&directives.group_by.join(", "));
    }

    Ok(AggregateStatement {
        statement: Statement {
            sql,
            params: clause.params,
        },
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::predicate::split_directives;
    use serde_json::json;

    fn users() -> TableSchema {
        TableSchema::new(
            "dim_users",
            vec![
                ColumnDescriptor::new("id", "UInt64"),
                ColumnDescriptor::new("name", "String"),
                ColumnDescriptor::new("email", "String"),
            ],
        )
    }

    fn orders() -> TableSchema {
        TableSchema::new(
            "fact_orders",
            vec![
                ColumnDescriptor::new("order_id", "UInt64"),
                ColumnDescriptor::new("user_id", "UInt64"),
                ColumnDescriptor::new("status", "String"),
            ],
        )
    }

    fn payload(v: serde_json::Value) -> MutationPayload {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_build_insert() {
        let stmt = build_insert(
            "dim_users",
            &users(),
            &payload(json!({"id": 1, "name": "Ann"})),
        )
        .unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO dim_users (id, name) VALUES ({id:UInt64}, {name:String})"
        );
        assert_eq!(stmt.params.get("id"), Some(&NativeValue::Json(json!(1))));
        assert_eq!(
            stmt.params.get("name"),
            Some(&NativeValue::Json(json!("Ann")))
        );
    }

    #[test]
    fn test_build_insert_unknown_column() {
        let err = build_insert(
            "dim_users",
            &users(),
            &payload(json!({"id": 1, "age": 30, "x); DROP TABLE dim_users; --": 1})),
        )
        .unwrap_err();
        assert_eq!(
            err,
            BuildError::UnknownColumn {
                role: ColumnRole::Payload,
                columns: vec!["age".into(), "x); DROP TABLE dim_users; --".into()],
            }
        );
    }

    #[test]
    fn test_build_insert_empty_payload() {
        let err = build_insert("dim_users", &users(), &MutationPayload::new()).unwrap_err();
        assert_eq!(err, BuildError::EmptyPayload);
    }

    #[test]
    fn test_build_select_without_filters() {
        let stmt = build_select("dim_users", &users(), &FilterSet::new()).unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM dim_users");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_build_select_with_filters() {
        let filters = FilterSet::from_pairs([("name", "Ann"), ("id", "3")]);
        let stmt = build_select("dim_users", &users(), &filters).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT * FROM dim_users WHERE name={name:String} AND id={id:UInt64}"
        );
        assert_eq!(stmt.params.get("id"), Some(&NativeValue::Int(3)));
    }

    #[test]
    fn test_build_select_rejects_unknown_filter() {
        let filters = FilterSet::from_pairs([("1=1 OR id", "3")]);
        let err = build_select("dim_users", &users(), &filters).unwrap_err();
        assert!(matches!(
            err,
            BuildError::UnknownColumn {
                role: ColumnRole::Filter,
                ..
            }
        ));
    }

    #[test]
    fn test_build_select_by_key() {
        let stmt = build_select_by_key("dim_users", &users(), "id", "42").unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM dim_users WHERE id={id:UInt64}");
        assert_eq!(stmt.params.get("id"), Some(&NativeValue::Int(42)));
    }

    #[test]
    fn test_build_select_by_key_unknown_key() {
        let err = build_select_by_key("dim_users", &users(), "uuid", "42").unwrap_err();
        assert_eq!(err.to_string(), "Invalid id column");
    }

    #[test]
    fn test_build_count_by_key() {
        let stmt = build_count_by_key("dim_users", &users(), "email", "a@b.c").unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT count() FROM dim_users WHERE email={email:String}"
        );
    }

    #[test]
    fn test_build_update() {
        let stmt = build_update(
            "dim_users",
            &users(),
            "id",
            "5",
            &payload(json!({"name": "Bo", "email": "bo@x.io"})),
        )
        .unwrap();
        assert_eq!(
            stmt.sql,
            "ALTER TABLE dim_users UPDATE name={name:String}, email={email:String} WHERE id={id:UInt64}"
        );
        assert_eq!(stmt.params.get("id"), Some(&NativeValue::Int(5)));
        assert_eq!(stmt.params.len(), 3);
    }

    #[test]
    fn test_build_update_key_in_payload_does_not_collide() {
        let stmt = build_update(
            "dim_users",
            &users(),
            "id",
            "5",
            &payload(json!({"id": 6})),
        )
        .unwrap();
        assert_eq!(
            stmt.sql,
            "ALTER TABLE dim_users UPDATE id={id:UInt64} WHERE id={__id:UInt64}"
        );
        assert_eq!(stmt.params.get("id"), Some(&NativeValue::Json(json!(6))));
        assert_eq!(stmt.params.get("__id"), Some(&NativeValue::Int(5)));
    }

    #[test]
    fn test_build_update_checks_key_before_payload() {
        let err = build_update(
            "dim_users",
            &users(),
            "pk",
            "5",
            &payload(json!({"nope": 1})),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid id column");
    }

    #[test]
    fn test_build_update_unknown_payload_column() {
        let err = build_update(
            "dim_users",
            &users(),
            "id",
            "5",
            &payload(json!({"nope": 1})),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Unknown columns: nope");
    }

    #[test]
    fn test_build_delete() {
        let stmt = build_delete("dim_users", &users(), "id", "9").unwrap();
        assert_eq!(stmt.sql, "ALTER TABLE dim_users DELETE WHERE id={id:UInt64}");
        assert_eq!(stmt.params.get("id"), Some(&NativeValue::Int(9)));
    }

    #[test]
    fn test_build_delete_best_effort_key() {
        let stmt = build_delete("dim_users", &users(), "id", "abc").unwrap();
        assert_eq!(
            stmt.params.get("id"),
            Some(&NativeValue::Text("abc".into()))
        );
    }

    #[test]
    fn test_build_aggregate_select_exact_sql() {
        let filters = FilterSet::from_pairs([
            ("aggregate", "count:order_id"),
            ("status", "active"),
            ("group_by", "status"),
        ]);
        let (directives, rest) = split_directives(filters).unwrap();
        let agg = build_aggregate_select("fact_orders", &orders(), &directives, &rest).unwrap();
        assert_eq!(
            agg.statement.sql,
            "SELECT COUNT(order_id) AS count_order_id, status FROM fact_orders WHERE status={status:String} GROUP BY status"
        );
        assert_eq!(agg.columns, vec!["count_order_id", "status"]);
        assert_eq!(
            agg.statement.params.get("status"),
            Some(&NativeValue::Text("active".into()))
        );
    }

    #[test]
    fn test_build_aggregate_without_group_by() {
        let filters = FilterSet::from_pairs([("aggregate", "max:user_id")]);
        let (directives, rest) = split_directives(filters).unwrap();
        let agg = build_aggregate_select("fact_orders", &orders(), &directives, &rest).unwrap();
        assert_eq!(
            agg.statement.sql,
            "SELECT MAX(user_id) AS max_user_id FROM fact_orders"
        );
        assert_eq!(agg.columns, vec!["max_user_id"]);
    }

    #[test]
    fn test_build_group_by_only() {
        let filters = FilterSet::from_pairs([("group_by", "status")]);
        let (directives, rest) = split_directives(filters).unwrap();
        let agg = build_aggregate_select("fact_orders", &orders(), &directives, &rest).unwrap();
        assert_eq!(
            agg.statement.sql,
            "SELECT status FROM fact_orders GROUP BY status"
        );
    }

    #[test]
    fn test_build_aggregate_rejects_unknown_filter() {
        let filters = FilterSet::from_pairs([("aggregate", "count:order_id"), ("region", "eu")]);
        let (directives, rest) = split_directives(filters).unwrap();
        let err = build_aggregate_select("fact_orders", &orders(), &directives, &rest).unwrap_err();
        assert_eq!(err.to_string(), "Invalid filter column: region");
    }
}
