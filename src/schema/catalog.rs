//! # Schema Catalog
//!
//! Fetches table schemas from the live database. With `cache_ttl_secs = 0`
//! every lookup goes to the backend; otherwise fetched schemas are reused
//! until they expire or are invalidated after a backend failure.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::{is_valid_table_name, TableSchema};
use crate::config::SchemaConfig;
use crate::gateway::{BackendError, BackendErrorClass, Database};

/// Error types for schema lookups
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Table does not exist (or its name is not a plain identifier)
    #[error("Table '{table}' not found")]
    NotFound { table: String },
    /// Metadata could not be fetched
    #[error("Schema lookup failed: {0}")]
    Backend(#[source] BackendError),
}

struct CachedSchema {
    schema: Arc<TableSchema>,
    fetched_at: Instant,
}

struct SchemaCache {
    ttl: Duration,
    entries: DashMap<String, CachedSchema>,
}

impl SchemaCache {
    fn get(&self, table: &str) -> Option<Arc<TableSchema>> {
        let entry = self.entries.get(table)?;
        if entry.fetched_at.elapsed() < self.ttl {
            Some(Arc::clone(&entry.schema))
        } else {
            None
        }
    }
}

/// Schema lookup shared by all request handlers.
pub struct SchemaCatalog {
    db: Arc<dyn Database>,
    cache: Option<SchemaCache>,
}

impl SchemaCatalog {
    pub fn new(db: Arc<dyn Database>, config: &SchemaConfig) -> Self {
        let cache = (config.cache_ttl_secs > 0).then(|| SchemaCache {
            ttl: Duration::from_secs(config.cache_ttl_secs),
            entries: DashMap::new(),
        });
        Self { db, cache }
    }

    pub fn caching_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Ordered column list of `table`.
    ///
    /// Names that are not plain identifiers are reported as `NotFound`
    /// without querying the backend. An empty column list is also `NotFound`.
    pub async fn get_schema(&self, table: &str) -> Result<Arc<TableSchema>, SchemaError> {
        if !is_valid_table_name(table) {
            tracing::debug!(table = %table, "rejected table name");
            return Err(SchemaError::NotFound {
                table: table.to_string(),
            });
        }

        if let Some(cache) = &self.cache {
            if let Some(schema) = cache.get(table) {
                tracing::debug!(table = %table, "schema cache hit");
                return Ok(schema);
            }
            tracing::debug!(table = %table, "schema cache miss");
        }

        let columns = match self.db.describe(table).await {
            Ok(columns) => columns,
            Err(e) if e.class() == BackendErrorClass::NotFound => {
                self.invalidate(table);
                return Err(SchemaError::NotFound {
                    table: table.to_string(),
                });
            }
            Err(e) => {
                tracing::error!(table = %table, error = %e, "failed to describe table");
                return Err(SchemaError::Backend(e));
            }
        };

        if columns.is_empty() {
            return Err(SchemaError::NotFound {
                table: table.to_string(),
            });
        }

        let schema = Arc::new(TableSchema::new(table, columns));
        if let Some(cache) = &self.cache {
            cache.entries.insert(
                table.to_string(),
                CachedSchema {
                    schema: Arc::clone(&schema),
                    fetched_at: Instant::now(),
                },
            );
        }
        Ok(schema)
    }

    /// Drop any cached schema for `table`.
    pub fn invalidate(&self, table: &str) {
        if let Some(cache) = &self.cache {
            if cache.entries.remove(table).is_some() {
                tracing::debug!(table = %table, "schema cache invalidated");
            }
        }
    }
}
