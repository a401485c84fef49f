//! Admin Handlers
//!
//! Root banner, health, liveness and readiness endpoints.

use std::sync::Arc;

use axum::{http::StatusCode, Extension, Json};

use crate::protocol::rest::dto::{HealthDto, RootDto};
use crate::protocol::rest::error::RestError;
use crate::protocol::Handler;

/// `GET /`
pub async fn root() -> Json<RootDto> {
    Json(RootDto {
        message: env!("CARGO_PKG_NAME").to_string(),
    })
}

/// Health check endpoint
pub async fn health(Extension(handler): Extension<Arc<Handler>>) -> Json<HealthDto> {
    Json(HealthDto {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: handler.uptime_seconds(),
    })
}

/// Liveness check: the process is up.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Readiness check: the database answers.
pub async fn readiness(
    Extension(handler): Extension<Arc<Handler>>,
) -> Result<StatusCode, RestError> {
    if handler.is_ready().await {
        Ok(StatusCode::OK)
    } else {
        Err(RestError::unavailable("Database unavailable"))
    }
}
