//! Shared test harness: a scripted in-memory `Database` and request helpers.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tablegate::config::{HttpConfig, SchemaConfig};
use tablegate::gateway::{BackendError, Database, QueryResult};
use tablegate::protocol::rest::create_router;
use tablegate::protocol::Handler;
use tablegate::{BoundParams, ColumnDescriptor};
use tower::ServiceExt;

/// What kind of call reached the fake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Describe,
    Query,
    Command,
    Insert,
}

/// One recorded call with its SQL (or table, for describe/insert) and
/// parameters rendered the way they travel on the wire.
#[derive(Debug, Clone)]
pub struct Call {
    pub kind: CallKind,
    pub sql: String,
    pub params: Vec<(String, String)>,
    pub body: Option<String>,
}

impl Call {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Scripted database. Tables answer `describe`; queries pop scripted
/// results in order; commands succeed unless a failure is armed.
#[derive(Default)]
pub struct FakeDatabase {
    tables: Mutex<HashMap<String, Vec<ColumnDescriptor>>>,
    query_results: Mutex<VecDeque<Result<QueryResult, String>>>,
    command_failure: Mutex<Option<String>>,
    describe_failure: Mutex<Option<String>>,
    ping_failure: Mutex<Option<String>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeDatabase {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_table(self: &Arc<Self>, table: &str, columns: &[(&str, &str)]) -> Arc<Self> {
        let descriptors = columns
            .iter()
            .map(|(name, ty)| ColumnDescriptor::new(*name, *ty))
            .collect();
        self.tables
            .lock()
            .unwrap()
            .insert(table.to_string(), descriptors);
        Arc::clone(self)
    }

    pub fn drop_table(&self, table: &str) {
        self.tables.lock().unwrap().remove(table);
    }

    /// Queue rows for the next `query` call.
    pub fn push_rows(&self, columns: &[&str], rows: Vec<Vec<Value>>) {
        self.query_results.lock().unwrap().push_back(Ok(QueryResult {
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            rows,
        }));
    }

    /// Queue a `SELECT count()` answer.
    pub fn push_count(&self, count: u64) {
        self.push_rows(&["count()"], vec![vec![json!(count)]]);
    }

    /// Queue a failure for the next `query` call.
    pub fn push_query_error(&self, message: &str) {
        self.query_results
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn fail_commands(&self, message: &str) {
        *self.command_failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_describe(&self, message: &str) {
        *self.describe_failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_ping(&self, message: &str) {
        *self.ping_failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls other than schema lookups.
    pub fn statements(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.kind != CallKind::Describe)
            .collect()
    }

    pub fn describe_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.kind == CallKind::Describe)
            .count()
    }

    fn record(&self, kind: CallKind, sql: &str, params: &BoundParams, body: Option<String>) {
        self.calls.lock().unwrap().push(Call {
            kind,
            sql: sql.to_string(),
            params: params
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_param_text()))
                .collect(),
            body,
        });
    }
}

#[async_trait]
impl Database for FakeDatabase {
    async fn command(&self, sql: &str, params: &BoundParams) -> Result<(), BackendError> {
        self.record(CallKind::Command, sql, params, None);
        match self.command_failure.lock().unwrap().clone() {
            Some(message) => Err(BackendError::Other(message)),
            None => Ok(()),
        }
    }

    async fn query(&self, sql: &str, params: &BoundParams) -> Result<QueryResult, BackendError> {
        self.record(CallKind::Query, sql, params, None);
        match self.query_results.lock().unwrap().pop_front() {
            Some(Ok(result)) => Ok(result),
            Some(Err(message)) => Err(BackendError::Other(message)),
            None => Ok(QueryResult::default()),
        }
    }

    async fn insert_json_rows(
        &self,
        table: &str,
        columns: &[String],
        body: Vec<u8>,
    ) -> Result<(), BackendError> {
        let params: BoundParams = BoundParams::new();
        self.record(
            CallKind::Insert,
            &format!("{table} ({})", columns.join(", ")),
            &params,
            Some(String::from_utf8_lossy(&body).into_owned()),
        );
        match self.command_failure.lock().unwrap().clone() {
            Some(message) => Err(BackendError::Other(message)),
            None => Ok(()),
        }
    }

    async fn describe(&self, table: &str) -> Result<Vec<ColumnDescriptor>, BackendError> {
        self.record(CallKind::Describe, table, &BoundParams::new(), None);
        if let Some(message) = self.describe_failure.lock().unwrap().clone() {
            return Err(BackendError::Other(message));
        }
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .ok_or_else(|| BackendError::Status {
                status: 404,
                message: format!(
                    "Code: 60. DB::Exception: Table default.{table} doesn't exist. (UNKNOWN_TABLE)"
                ),
            })
    }

    async fn ping(&self) -> Result<(), BackendError> {
        match self.ping_failure.lock().unwrap().clone() {
            Some(message) => Err(BackendError::Other(message)),
            None => Ok(()),
        }
    }
}

/// `fact_orders` and `dim_users`, the tables most tests use.
pub fn standard_db() -> Arc<FakeDatabase> {
    FakeDatabase::new()
        .with_table(
            "fact_orders",
            &[
                ("order_id", "UInt64"),
                ("user_id", "UInt64"),
                ("status", "String"),
            ],
        )
        .with_table(
            "dim_users",
            &[
                ("id", "UInt64"),
                ("name", "String"),
                ("email", "String"),
                ("score", "Float64"),
            ],
        )
}

pub fn create_app_with(db: Arc<FakeDatabase>, http: &HttpConfig, schema: &SchemaConfig) -> axum::Router {
    let handler = Arc::new(Handler::new(db, schema));
    create_router(handler, http)
}

pub fn create_app(db: Arc<FakeDatabase>) -> axum::Router {
    let mut http = HttpConfig::default();
    http.enable_raw_sql = true;
    create_app_with(db, &http, &SchemaConfig::default())
}

pub async fn send_raw(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap_or(json!({}));
    (status, json)
}

pub async fn send_json_request(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    send_raw(app, req).await
}
