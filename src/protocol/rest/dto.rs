//! REST API Data Transfer Objects
//!
//! Request/response types for the REST API endpoints. Row bodies and row
//! results are plain JSON objects and have no dedicated type.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `{"status": "ok"}`, returned by every successful mutation.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Raw SQL passthrough request
#[derive(Debug, Deserialize)]
pub struct SqlRequest {
    /// Statement text, sent unmodified
    pub sql: String,
    /// Values for `{name:Type}` placeholders in `sql`
    #[serde(default)]
    pub params: Option<Map<String, Value>>,
    /// Whether rows should be returned
    #[serde(default)]
    pub is_select: bool,
}

/// Raw SQL select response: result tuples, positionally ordered.
#[derive(Debug, Serialize)]
pub struct SqlRowsResponse {
    pub rows: Vec<Vec<Value>>,
}

/// `?id_column=` on keyed routes
#[derive(Debug, Deserialize)]
pub struct IdColumnQuery {
    pub id_column: Option<String>,
}

/// Root banner
#[derive(Debug, Serialize)]
pub struct RootDto {
    pub message: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthDto {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}
