//! Database Gateway
//!
//! The "execute statement / execute query" capability the HTTP layer is
//! built on. One `Database` instance is constructed at process start and
//! shared by every request through an `Arc`; there is no per-request
//! connection and no locking around it, so implementations must be safe
//! for concurrent use.
//!
//! Statements already sent are not cancelled when the HTTP caller goes
//! away, so a mutation may still complete after its request was abandoned.

pub mod clickhouse;
pub mod error;
pub mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::schema::ColumnDescriptor;
use crate::sql::BoundParams;

pub use clickhouse::ClickHouseHttp;
pub use error::{classify_backend_error, BackendError, BackendErrorClass};
pub use retry::{connect_with_retry, RetryPolicy};

/// Rows returned by a query, positionally aligned with `columns`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

#[async_trait]
pub trait Database: Send + Sync {
    /// Execute a statement that returns no rows.
    async fn command(&self, sql: &str, params: &BoundParams) -> Result<(), BackendError>;

    /// Execute a statement and collect its rows.
    async fn query(&self, sql: &str, params: &BoundParams) -> Result<QueryResult, BackendError>;

    /// Bulk-insert newline-delimited JSON objects into `table`.
    async fn insert_json_rows(
        &self,
        table: &str,
        columns: &[String],
        body: Vec<u8>,
    ) -> Result<(), BackendError>;

    /// Column list of `table` in physical order.
    ///
    /// `table` must already be a validated identifier.
    async fn describe(&self, table: &str) -> Result<Vec<ColumnDescriptor>, BackendError> {
        let result = self
            .query(&format!("DESCRIBE TABLE {table}"), &BoundParams::new())
            .await?;
        result
            .rows
            .into_iter()
            .map(|row| match (row.first(), row.get(1)) {
                (Some(serde_json::Value::String(name)), Some(serde_json::Value::String(ty))) => {
                    Ok(ColumnDescriptor::new(name.clone(), ty.clone()))
                }
                _ => Err(BackendError::Decode(format!(
                    "unexpected DESCRIBE row for {table}: {row:?}"
                ))),
            })
            .collect()
    }

    /// Cheap round trip used for readiness and startup checks.
    async fn ping(&self) -> Result<(), BackendError> {
        self.query("SELECT 1", &BoundParams::new()).await.map(|_| ())
    }
}
