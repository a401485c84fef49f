//! SQL Construction
//!
//! Builds parameterized ClickHouse statements from a live `TableSchema`.
//!
//! # Injection surface
//!
//! Values always travel as bound `{name:Type}` parameters. Identifiers
//! (table and column names) cannot be bound, so they are interpolated into
//! the statement text. That is the one place caller input reaches SQL text,
//! and it is closed by construction: a column name is only emitted after it
//! has been found in the schema fetched for the table, and the table name was
//! accepted by the metadata lookup. Any name that fails the membership check
//! is rejected with `BuildError::UnknownColumn` before a statement exists.

pub mod params;
pub mod predicate;
pub mod statement;

use std::fmt;

use thiserror::Error;

pub use params::BoundParams;
pub use predicate::{
    build_filter_clause, split_directives, AggregateDirective, AggregateFunction, FilterClause,
    QueryDirectives,
};
pub use statement::{
    build_aggregate_select, build_count_by_key, build_delete, build_insert, build_select,
    build_select_by_key, build_update, AggregateStatement,
};

/// Where in a request an unknown column was referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    /// Key of a POST/PUT body
    Payload,
    /// Query-string equality filter
    Filter,
    /// `id_column` of a keyed request
    Key,
    /// Column of an `aggregate=func:column` directive
    Aggregate,
    /// Column of a `group_by` directive
    GroupBy,
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRole::Payload => write!(f, "payload"),
            ColumnRole::Filter => write!(f, "filter"),
            ColumnRole::Key => write!(f, "id"),
            ColumnRole::Aggregate => write!(f, "aggregate"),
            ColumnRole::GroupBy => write!(f, "group_by"),
        }
    }
}

/// Rejections raised while validating and building a statement.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("{}", unknown_column_message(.role, .columns))]
    UnknownColumn {
        role: ColumnRole,
        columns: Vec<String>,
    },

    #[error("Invalid aggregate function: {0}")]
    InvalidAggregateFunction(String),

    #[error("Invalid aggregate directive '{0}', expected func:column")]
    MalformedAggregate(String),

    #[error("Request body must contain at least one column")]
    EmptyPayload,
}

fn unknown_column_message(role: &ColumnRole, columns: &[String]) -> String {
    match role {
        ColumnRole::Payload => format!("Unknown columns: {}", columns.join(", ")),
        ColumnRole::Key => "Invalid id column".to_string(),
        other => format!("Invalid {other} column: {}", columns.join(", ")),
    }
}

impl BuildError {
    pub(crate) fn unknown(role: ColumnRole, columns: Vec<String>) -> Self {
        BuildError::UnknownColumn { role, columns }
    }
}

/// A statement ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: BoundParams,
}

/// `{name:Type}` placeholder for a bound parameter.
pub(crate) fn placeholder(param: &str, declared_type: &str) -> String {
    format!("{{{param}:{declared_type}}}")
}
