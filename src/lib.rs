//! # tablegate
//!
//! Schema-generic HTTP CRUD gateway for ClickHouse, plus a Parquet loader.
//!
//! ## Request Pipeline
//! ```text
//! HTTP request (/crud/:table)
//!     ↓
//! [SchemaCatalog]       → live TableSchema (DESCRIBE TABLE, optional TTL cache)
//!     ↓
//! [Column validation]   → unknown payload/filter/key columns rejected (400)
//!     ↓
//! [ValueCoercion]       → query-string text to native values
//!     ↓
//! [Statement builders]  → SQL with {name:Type} placeholders + bound params
//!     ↓
//! [Database gateway]    → ClickHouse HTTP interface
//!     ↓
//! Rows zipped into JSON objects
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tablegate::{protocol::rest, Config, Handler};
//!
//! let config = Config::load()?;
//! let handler = Arc::new(Handler::from_config(&config)?);
//! rest::start_http_server(handler, &config.http).await?;
//! ```

pub mod auth;
pub mod config;
pub mod gateway;
pub mod loader;
pub mod logging;
pub mod model;
pub mod protocol;
pub mod schema;
pub mod sql;

pub use config::Config;
pub use gateway::{BackendError, ClickHouseHttp, Database, QueryResult};
pub use model::{FilterSet, MutationPayload, RowRecord};
pub use protocol::{GatewayError, Handler};
pub use schema::{ColumnDescriptor, ColumnType, SchemaCatalog, TableSchema};
pub use sql::{BoundParams, BuildError, Statement};
