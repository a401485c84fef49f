//! Parquet Loader
//!
//! Copies one Parquet object from S3-compatible storage into a ClickHouse
//! table: the destination table is created from the Parquet schema if
//! missing, then rows are streamed in batches as `JSONEachRow` inserts.

pub mod types;

use std::sync::Arc;
use std::time::{Duration, Instant};

use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjPath;
use object_store::ObjectStore;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::config::LoaderConfig;
use crate::gateway::{BackendError, Database};
use crate::schema::is_valid_table_name;
use crate::sql::BoundParams;

pub use types::{arrow_to_clickhouse, create_table_sql, encode_json_rows, prepare_batch};

/// Error types for loader runs
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("Invalid table name: {0}")]
    InvalidTable(String),

    #[error("batch size must be greater than zero")]
    InvalidBatchSize,

    #[error("Parquet object '{0}' has no columns")]
    EmptySchema(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Object storage error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Database error: {0}")]
    Backend(#[from] BackendError),
}

/// Outcome of a completed load.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: u64,
    pub batches: usize,
    pub elapsed: Duration,
}

/// S3 client for `bucket` at the configured endpoint.
pub fn build_object_store(
    config: &LoaderConfig,
    bucket: &str,
) -> Result<Arc<dyn ObjectStore>, LoaderError> {
    let mut builder = AmazonS3Builder::new()
        .with_bucket_name(bucket)
        .with_region(&config.region)
        .with_endpoint(&config.endpoint)
        .with_allow_http(config.allow_http);

    match (&config.access_key, &config.secret_key) {
        (Some(ak), Some(sk)) => {
            builder = builder
                .with_access_key_id(ak.trim())
                .with_secret_access_key(sk.trim());
        }
        (None, None) => {}
        _ => {
            return Err(LoaderError::Config(
                "access_key and secret_key must be provided together".into(),
            ))
        }
    }

    Ok(Arc::new(builder.build()?))
}

/// Load `object` from `store` into `table`, `batch_size` rows per insert.
pub async fn load_parquet(
    store: Arc<dyn ObjectStore>,
    object: &str,
    db: &dyn Database,
    table: &str,
    batch_size: usize,
) -> Result<LoadReport, LoaderError> {
    if !is_valid_table_name(table) {
        return Err(LoaderError::InvalidTable(table.to_string()));
    }
    if batch_size == 0 {
        return Err(LoaderError::InvalidBatchSize);
    }

    let start = Instant::now();
    tracing::info!(object = %object, table = %table, "fetching parquet object");
    let bytes = store.get(&ObjPath::from(object)).await?.bytes().await?;
    tracing::info!(object = %object, bytes = bytes.len(), "parquet object fetched");

    let builder = ParquetRecordBatchReaderBuilder::try_new(bytes)?.with_batch_size(batch_size);
    let schema = Arc::clone(builder.schema());
    if schema.fields().is_empty() {
        return Err(LoaderError::EmptySchema(object.to_string()));
    }
    let columns: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();

    db.command(&create_table_sql(table, &schema), &BoundParams::new())
        .await?;
    tracing::info!(table = %table, columns = columns.len(), "destination table ready");

    let reader = builder.build()?;
    let mut rows = 0u64;
    let mut batches = 0usize;
    for batch in reader {
        let batch = batch?;
        if batch.num_rows() == 0 {
            continue;
        }
        let body = encode_json_rows(&batch)?;
        db.insert_json_rows(table, &columns, body).await?;
        rows += batch.num_rows() as u64;
        batches += 1;
        tracing::info!(table = %table, batch = batches, rows, "batch inserted");
    }

    let elapsed = start.elapsed();
    tracing::info!(
        table = %table,
        rows,
        batches,
        elapsed_secs = elapsed.as_secs_f64(),
        "load complete"
    );
    Ok(LoadReport {
        table: table.to_string(),
        columns,
        rows,
        batches,
        elapsed,
    })
}
