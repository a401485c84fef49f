//! CRUD Handlers
//!
//! Generic table endpoints. The table name comes from the path; columns
//! are whatever the live schema reports.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query,
    },
    Extension, Json,
};

use crate::model::{FilterSet, MutationPayload, RowRecord};
use crate::protocol::rest::dto::{IdColumnQuery, StatusResponse};
use crate::protocol::rest::error::RestError;
use crate::protocol::{Handler, DEFAULT_ID_COLUMN};

fn id_column(query: &IdColumnQuery) -> &str {
    query.id_column.as_deref().unwrap_or(DEFAULT_ID_COLUMN)
}

/// `POST /crud/:table`
pub async fn create_row(
    Extension(handler): Extension<Arc<Handler>>,
    Path(table): Path<String>,
    body: Result<Json<MutationPayload>, JsonRejection>,
) -> Result<Json<StatusResponse>, RestError> {
    let Json(payload) = body?;
    handler.insert_row(&table, &payload).await?;
    Ok(Json(StatusResponse::ok()))
}

/// `GET /crud/:table?col=value&...[&aggregate=func:col][&group_by=col]`
pub async fn list_rows(
    Extension(handler): Extension<Arc<Handler>>,
    Path(table): Path<String>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<Vec<RowRecord>>, RestError> {
    let Query(pairs) = query?;
    let rows = handler
        .query_rows(&table, FilterSet::from_pairs(pairs))
        .await?;
    Ok(Json(rows))
}

/// `GET /crud/:table/:item_id?id_column=id`
pub async fn read_row(
    Extension(handler): Extension<Arc<Handler>>,
    Path((table, item_id)): Path<(String, String)>,
    query: Result<Query<IdColumnQuery>, QueryRejection>,
) -> Result<Json<RowRecord>, RestError> {
    let Query(query) = query?;
    let row = handler
        .read_row(&table, &item_id, id_column(&query))
        .await?;
    Ok(Json(row))
}

/// `PUT /crud/:table/:item_id?id_column=id`
pub async fn update_row(
    Extension(handler): Extension<Arc<Handler>>,
    Path((table, item_id)): Path<(String, String)>,
    query: Result<Query<IdColumnQuery>, QueryRejection>,
    body: Result<Json<MutationPayload>, JsonRejection>,
) -> Result<Json<StatusResponse>, RestError> {
    let Query(query) = query?;
    let Json(payload) = body?;
    handler
        .update_row(&table, &item_id, id_column(&query), &payload)
        .await?;
    Ok(Json(StatusResponse::ok()))
}

/// `DELETE /crud/:table/:item_id?id_column=id`
pub async fn delete_row(
    Extension(handler): Extension<Arc<Handler>>,
    Path((table, item_id)): Path<(String, String)>,
    query: Result<Query<IdColumnQuery>, QueryRejection>,
) -> Result<Json<StatusResponse>, RestError> {
    let Query(query) = query?;
    handler
        .delete_row(&table, &item_id, id_column(&query))
        .await?;
    Ok(Json(StatusResponse::ok()))
}
