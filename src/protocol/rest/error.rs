//! REST API Error Types
//!
//! `RestError` is the only place an error turns into an HTTP response.
//! Every body has the shape `{"detail": <message>}`.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::protocol::GatewayError;

/// Message returned for every server-side failure.
pub const INTERNAL_DETAIL: &str = "Internal server error";

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub detail: String,
}

/// REST API error that can be returned from handlers
#[derive(Debug)]
pub struct RestError {
    pub status: StatusCode,
    pub error: ApiError,
}

impl RestError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            error: ApiError {
                detail: detail.into(),
            },
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, detail)
    }

    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, detail)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_DETAIL)
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

// Conversions from domain errors
impl From<GatewayError> for RestError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::SchemaNotFound { .. } | GatewayError::RowNotFound => {
                RestError::not_found(err.to_string())
            }
            GatewayError::UnknownColumn(_)
            | GatewayError::InvalidAggregateFunction(_)
            | GatewayError::InvalidRequest(_) => RestError::bad_request(err.to_string()),
            GatewayError::Unauthorized(_) => RestError::unauthorized(err.to_string()),
            GatewayError::BackendFailure(ref e) => {
                tracing::error!(error = %e, "backend failure");
                RestError::internal()
            }
            GatewayError::Internal(ref message) => {
                tracing::error!(error = %message, "internal error");
                RestError::internal()
            }
        }
    }
}

impl From<JsonRejection> for RestError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return RestError::new(StatusCode::PAYLOAD_TOO_LARGE, rejection.body_text());
        }
        RestError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for RestError {
    fn from(rejection: QueryRejection) -> Self {
        RestError::bad_request(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::BackendError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                GatewayError::SchemaNotFound { table: "t".into() },
                StatusCode::NOT_FOUND,
            ),
            (GatewayError::RowNotFound, StatusCode::NOT_FOUND),
            (
                GatewayError::UnknownColumn("Unknown columns: x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                GatewayError::InvalidAggregateFunction("drop".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                GatewayError::InvalidRequest("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                GatewayError::Unauthorized("no".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (
                GatewayError::BackendFailure(BackendError::Other("x".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                GatewayError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(RestError::from(err).status, status);
        }
    }

    #[test]
    fn test_backend_text_not_leaked() {
        let err = GatewayError::BackendFailure(BackendError::Status {
            status: 500,
            message: "Code: 62. DB::Exception: Syntax error at secret_column".into(),
        });
        let rest = RestError::from(err);
        assert_eq!(rest.error.detail, INTERNAL_DETAIL);
    }

    #[test]
    fn test_row_not_found_detail() {
        let rest = RestError::from(GatewayError::RowNotFound);
        assert_eq!(rest.error.detail, "Row not found");
    }
}
