//! Error types for the gateway request path.

use crate::gateway::BackendError;
use crate::model::RowShapeError;
use crate::schema::SchemaError;
use crate::sql::BuildError;

/// Everything a CRUD or passthrough request can fail with.
///
/// Variants carry the caller-facing message, except `BackendFailure` and
/// `Internal` whose text is for the server log only.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Target table absent
    #[error("Table '{table}' not found")]
    SchemaNotFound { table: String },

    /// Payload, filter, key or directive column absent from the schema
    #[error("{0}")]
    UnknownColumn(String),

    /// Aggregate function outside the allow-list
    #[error("Invalid aggregate function: {0}")]
    InvalidAggregateFunction(String),

    /// Request is well-formed JSON but not acceptable
    #[error("{0}")]
    InvalidRequest(String),

    /// Key lookup or existence check matched no rows
    #[error("Row not found")]
    RowNotFound,

    /// Any other database error
    #[error("Backend failure: {0}")]
    BackendFailure(#[from] BackendError),

    /// Missing or rejected credential
    #[error("{0}")]
    Unauthorized(String),

    /// Invariant broken inside the gateway
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    /// True when the failure came from the database rather than the request.
    pub fn is_backend(&self) -> bool {
        matches!(self, GatewayError::BackendFailure(_))
    }
}

impl From<BuildError> for GatewayError {
    fn from(e: BuildError) -> Self {
        match e {
            BuildError::UnknownColumn { .. } => GatewayError::UnknownColumn(e.to_string()),
            BuildError::InvalidAggregateFunction(func) => {
                GatewayError::InvalidAggregateFunction(func)
            }
            BuildError::MalformedAggregate(_) | BuildError::EmptyPayload => {
                GatewayError::InvalidRequest(e.to_string())
            }
        }
    }
}

impl From<SchemaError> for GatewayError {
    fn from(e: SchemaError) -> Self {
        match e {
            SchemaError::NotFound { table } => GatewayError::SchemaNotFound { table },
            SchemaError::Backend(inner) => GatewayError::BackendFailure(inner),
        }
    }
}

impl From<RowShapeError> for GatewayError {
    fn from(e: RowShapeError) -> Self {
        GatewayError::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::ColumnRole;

    #[test]
    fn test_unknown_payload_message() {
        let err: GatewayError = BuildError::UnknownColumn {
            role: ColumnRole::Payload,
            columns: vec!["a".into(), "b".into()],
        }
        .into();
        assert!(matches!(err, GatewayError::UnknownColumn(_)));
        assert_eq!(err.to_string(), "Unknown columns: a, b");
    }

    #[test]
    fn test_invalid_key_message() {
        let err: GatewayError = BuildError::UnknownColumn {
            role: ColumnRole::Key,
            columns: vec!["nope".into()],
        }
        .into();
        assert_eq!(err.to_string(), "Invalid id column");
    }

    #[test]
    fn test_aggregate_errors() {
        let err: GatewayError = BuildError::InvalidAggregateFunction("drop".into()).into();
        assert!(matches!(err, GatewayError::InvalidAggregateFunction(ref f) if f == "drop"));

        let err: GatewayError = BuildError::MalformedAggregate("count".into()).into();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
    }

    #[test]
    fn test_schema_errors() {
        let err: GatewayError = SchemaError::NotFound {
            table: "ghost".into(),
        }
        .into();
        assert!(matches!(err, GatewayError::SchemaNotFound { .. }));

        let err: GatewayError = SchemaError::Backend(BackendError::Other("boom".into())).into();
        assert!(err.is_backend());
    }

    #[test]
    fn test_row_shape_is_internal() {
        let err: GatewayError = RowShapeError {
            expected: 3,
            actual: 2,
        }
        .into();
        assert!(matches!(err, GatewayError::Internal(_)));
    }
}
