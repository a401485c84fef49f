//! Handler for `tablegate`
//!
//! Transport-independent CRUD orchestration used by the REST API. Each
//! operation runs the same sequence: fetch the live schema, validate every
//! referenced column, coerce values, build a parameterized statement,
//! execute it, and shape the result rows. Validation failures never reach
//! the database.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};

use super::error::{GatewayError, GatewayResult};
use crate::config::{Config, SchemaConfig};
use crate::gateway::{BackendError, BackendErrorClass, ClickHouseHttp, Database, QueryResult};
use crate::model::{zip_rows, FilterSet, MutationPayload, RowRecord};
use crate::schema::{SchemaCatalog, TableSchema};
use crate::sql::{
    build_aggregate_select, build_count_by_key, build_delete, build_insert, build_select,
    build_select_by_key, build_update, split_directives, BoundParams, Statement,
};

/// Key column used when a keyed request does not name one.
pub const DEFAULT_ID_COLUMN: &str = "id";

/// Shared request handler. One instance per process, behind an `Arc`.
pub struct Handler {
    db: Arc<dyn Database>,
    catalog: SchemaCatalog,
    start_time: Instant,
    query_count: AtomicU64,
    mutation_count: AtomicU64,
}

impl Handler {
    /// Create a handler over an already constructed database gateway.
    pub fn new(db: Arc<dyn Database>, schema: &SchemaConfig) -> Self {
        Self {
            catalog: SchemaCatalog::new(Arc::clone(&db), schema),
            db,
            start_time: Instant::now(),
            query_count: AtomicU64::new(0),
            mutation_count: AtomicU64::new(0),
        }
    }

    /// Create a handler talking to ClickHouse as configured.
    pub fn from_config(config: &Config) -> Result<Self, BackendError> {
        let db = ClickHouseHttp::new(&config.database)?;
        Ok(Self::new(Arc::new(db), &config.schema))
    }

    pub fn database(&self) -> &Arc<dyn Database> {
        &self.db
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// Get uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get total read statements executed.
    pub fn total_queries(&self) -> u64 {
        self.query_count.load(Ordering::Relaxed)
    }

    /// Get total mutations executed.
    pub fn total_mutations(&self) -> u64 {
        self.mutation_count.load(Ordering::Relaxed)
    }

    /// Whether the database currently answers.
    pub async fn is_ready(&self) -> bool {
        match self.db.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "readiness check failed");
                false
            }
        }
    }

    /// Insert one row. Every payload key must be a column of `table`.
    pub async fn insert_row(&self, table: &str, payload: &MutationPayload) -> GatewayResult<()> {
        let schema = self.catalog.get_schema(table).await?;
        let stmt = build_insert(table, &schema, payload)?;
        self.execute(table, &stmt).await?;
        tracing::info!(table = %table, columns = payload.len(), "row inserted");
        Ok(())
    }

    /// Filtered select, or an aggregate select when the filters carry
    /// `aggregate` / `group_by` directives.
    pub async fn query_rows(&self, table: &str, filters: FilterSet) -> GatewayResult<Vec<RowRecord>> {
        let schema = self.catalog.get_schema(table).await?;
        let (directives, filters) = split_directives(filters)?;

        if directives.is_empty() {
            let stmt = build_select(table, &schema, &filters)?;
            let result = self.fetch(table, &stmt).await?;
            return self.shape_rows(table, &schema, result);
        }

        let agg = build_aggregate_select(table, &schema, &directives, &filters)?;
        let result = self.fetch(table, &agg.statement).await?;
        Ok(zip_rows(&agg.columns, result.rows)?)
    }

    /// Select one row by key.
    pub async fn read_row(
        &self,
        table: &str,
        item_id: &str,
        id_column: &str,
    ) -> GatewayResult<RowRecord> {
        let schema = self.catalog.get_schema(table).await?;
        let stmt = build_select_by_key(table, &schema, id_column, item_id)?;
        let result = self.fetch(table, &stmt).await?;
        self.shape_rows(table, &schema, result)?
            .into_iter()
            .next()
            .ok_or(GatewayError::RowNotFound)
    }

    /// Update one row by key. Missing rows are reported before any
    /// mutation is issued.
    pub async fn update_row(
        &self,
        table: &str,
        item_id: &str,
        id_column: &str,
        payload: &MutationPayload,
    ) -> GatewayResult<()> {
        let schema = self.catalog.get_schema(table).await?;
        let stmt = build_update(table, &schema, id_column, item_id, payload)?;
        let exists = build_count_by_key(table, &schema, id_column, item_id)?;
        self.ensure_exists(table, &exists).await?;
        self.execute(table, &stmt).await?;
        tracing::info!(table = %table, key = %id_column, "row update submitted");
        Ok(())
    }

    /// Delete one row by key. Missing rows are reported before any
    /// mutation is issued.
    pub async fn delete_row(&self, table: &str, item_id: &str, id_column: &str) -> GatewayResult<()> {
        let schema = self.catalog.get_schema(table).await?;
        let stmt = build_delete(table, &schema, id_column, item_id)?;
        let exists = build_count_by_key(table, &schema, id_column, item_id)?;
        self.ensure_exists(table, &exists).await?;
        self.execute(table, &stmt).await?;
        tracing::info!(table = %table, key = %id_column, "row delete submitted");
        Ok(())
    }

    /// Raw passthrough. The statement is sent as given; `params` are bound
    /// to whatever `{name:Type}` placeholders it contains.
    ///
    /// Returns the result tuples for `is_select`, `None` otherwise.
    pub async fn execute_sql(
        &self,
        sql: &str,
        params: Map<String, Value>,
        is_select: bool,
    ) -> GatewayResult<Option<Vec<Vec<Value>>>> {
        let params = BoundParams::from(params);
        tracing::info!(is_select, params = params.len(), "raw sql");
        if is_select {
            self.query_count.fetch_add(1, Ordering::Relaxed);
            let result = self.db.query(sql, &params).await?;
            Ok(Some(result.rows))
        } else {
            self.mutation_count.fetch_add(1, Ordering::Relaxed);
            self.db.command(sql, &params).await?;
            Ok(None)
        }
    }

    async fn ensure_exists(&self, table: &str, stmt: &Statement) -> GatewayResult<()> {
        let result = self.fetch(table, stmt).await?;
        if count_of(&result)? == 0 {
            return Err(GatewayError::RowNotFound);
        }
        Ok(())
    }

    async fn fetch(&self, table: &str, stmt: &Statement) -> GatewayResult<QueryResult> {
        self.query_count.fetch_add(1, Ordering::Relaxed);
        self.db
            .query(&stmt.sql, &stmt.params)
            .await
            .map_err(|e| self.backend_failure(table, e))
    }

    async fn execute(&self, table: &str, stmt: &Statement) -> GatewayResult<()> {
        self.mutation_count.fetch_add(1, Ordering::Relaxed);
        self.db
            .command(&stmt.sql, &stmt.params)
            .await
            .map_err(|e| self.backend_failure(table, e))
    }

    /// Zip `SELECT *` rows against the columns the backend reported.
    ///
    /// A result whose columns differ from `schema` means the table changed
    /// since the schema was fetched, so the cached copy is dropped. Results
    /// without column metadata fall back to the schema's column order.
    fn shape_rows(
        &self,
        table: &str,
        schema: &TableSchema,
        result: QueryResult,
    ) -> GatewayResult<Vec<RowRecord>> {
        let expected = schema.column_names();
        let columns = if result.columns.is_empty() {
            expected
        } else {
            if result.columns != expected {
                tracing::debug!(table = %table, "result columns differ from cached schema");
                self.catalog.invalidate(table);
            }
            result.columns
        };
        zip_rows(&columns, result.rows).map_err(|e| {
            self.catalog.invalidate(table);
            e.into()
        })
    }

    /// Any statement failure drops the cached schema for `table`. A table
    /// dropped between the metadata fetch and execution is reported as
    /// missing rather than as a backend failure.
    fn backend_failure(&self, table: &str, e: BackendError) -> GatewayError {
        self.catalog.invalidate(table);
        if e.class() == BackendErrorClass::NotFound {
            tracing::warn!(table = %table, error = %e, "table disappeared during request");
            return GatewayError::SchemaNotFound {
                table: table.to_string(),
            };
        }
        GatewayError::BackendFailure(e)
    }
}

/// First cell of a `SELECT count()` result.
fn count_of(result: &QueryResult) -> GatewayResult<u64> {
    let cell = result.rows.first().and_then(|row| row.first());
    match cell {
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| GatewayError::Internal(format!("count is not an unsigned integer: {n}"))),
        Some(Value::String(s)) => s
            .parse()
            .map_err(|_| GatewayError::Internal(format!("count is not numeric: {s}"))),
        other => Err(GatewayError::Internal(format!(
            "unexpected count result: {other:?}"
        ))),
    }
}
