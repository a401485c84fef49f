//! Raw SQL Handler
//!
//! Operator-only passthrough. The statement is executed exactly as sent;
//! this endpoint is a trust boundary and is only mounted behind
//! authentication or an explicit opt-in.

use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    response::{IntoResponse, Response},
    Extension, Json,
};

use crate::protocol::rest::dto::{SqlRequest, SqlRowsResponse, StatusResponse};
use crate::protocol::rest::error::RestError;
use crate::protocol::Handler;

/// `POST /sql`
pub async fn execute_sql(
    Extension(handler): Extension<Arc<Handler>>,
    body: Result<Json<SqlRequest>, JsonRejection>,
) -> Result<Response, RestError> {
    let Json(request) = body?;
    let params = request.params.unwrap_or_default();
    let rows = handler
        .execute_sql(&request.sql, params, request.is_select)
        .await?;
    Ok(match rows {
        Some(rows) => Json(SqlRowsResponse { rows }).into_response(),
        None => Json(StatusResponse::ok()).into_response(),
    })
}
