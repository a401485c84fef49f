//! Predicate Builder
//!
//! Turns query-string filters into a parameterized `AND`-joined equality
//! clause, and extracts the optional `aggregate=func:column` and
//! `group_by=col[,col...]` directives that ride along in the same query
//! string.

use std::fmt;
use std::str::FromStr;

use super::{placeholder, BoundParams, BuildError, ColumnRole};
use crate::model::FilterSet;
use crate::schema::{coerce, TableSchema};

/// Reserved query key for the aggregate directive.
pub const AGGREGATE_KEY: &str = "aggregate";
/// Reserved query key for the group-by directive.
pub const GROUP_BY_KEY: &str = "group_by";

/// Allow-listed aggregate functions. Nothing else is ever emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn sql_name(self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
        }
    }

    pub fn alias_prefix(self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
        }
    }
}

impl FromStr for AggregateFunction {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "count" => Ok(AggregateFunction::Count),
            "sum" => Ok(AggregateFunction::Sum),
            "avg" => Ok(AggregateFunction::Avg),
            "min" => Ok(AggregateFunction::Min),
            "max" => Ok(AggregateFunction::Max),
            _ => Err(BuildError::InvalidAggregateFunction(s.to_string())),
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// `func:column` parsed from the `aggregate` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateDirective {
    pub function: AggregateFunction,
    pub column: String,
}

impl AggregateDirective {
    /// Output alias, `{func}_{column}` in lowercase.
    pub fn alias(&self) -> String {
        format!("{}_{}", self.function.alias_prefix(), self.column).to_lowercase()
    }

    pub fn parse(raw: &str) -> Result<Self, BuildError> {
        let (func, column) = raw
            .split_once(':')
            .ok_or_else(|| BuildError::MalformedAggregate(raw.to_string()))?;
        let column = column.trim();
        if column.is_empty() {
            return Err(BuildError::MalformedAggregate(raw.to_string()));
        }
        Ok(Self {
            function: func.parse()?,
            column: column.to_string(),
        })
    }
}

/// Directives stripped out of a query string before filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDirectives {
    pub aggregate: Option<AggregateDirective>,
    pub group_by: Vec<String>,
}

impl QueryDirectives {
    pub fn is_empty(&self) -> bool {
        self.aggregate.is_none() && self.group_by.is_empty()
    }

    /// Check every referenced column against the schema.
    pub fn validate(&self, schema: &TableSchema) -> Result<(), BuildError> {
        if let Some(agg) = &self.aggregate {
            if !schema.contains(&agg.column) {
                return Err(BuildError::unknown(
                    ColumnRole::Aggregate,
                    vec![agg.column.clone()],
                ));
            }
        }
        let unknown = schema.unknown_columns(self.group_by.iter().map(String::as_str));
        if !unknown.is_empty() {
            return Err(BuildError::unknown(ColumnRole::GroupBy, unknown));
        }
        Ok(())
    }
}

/// Remove `aggregate` and `group_by` from `filters`, returning the parsed
/// directives and the remaining equality filters.
pub fn split_directives(mut filters: FilterSet) -> Result<(QueryDirectives, FilterSet), BuildError> {
    let aggregate = filters
        .remove(AGGREGATE_KEY)
        .map(|raw| AggregateDirective::parse(&raw))
        .transpose()?;
    let group_by: Vec<String> = filters
        .remove(GROUP_BY_KEY)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Ok((QueryDirectives { aggregate, group_by }, filters))
}

/// An equality clause without the leading `WHERE`, plus its parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterClause {
    pub sql: String,
    pub params: BoundParams,
}

impl FilterClause {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// ` WHERE <clause>`, or nothing for an empty filter set.
    pub fn where_sql(&self) -> String {
        if self.sql.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.sql)
        }
    }
}

/// Build `col={col:Type} AND ...` from filters whose keys the caller has
/// already checked against `schema`.
///
/// A key that is not a column still yields `UnknownColumn` rather than a
/// panic, but callers are expected to have rejected it with a
/// filter-specific message first.
pub fn build_filter_clause(
    filters: &FilterSet,
    schema: &TableSchema,
) -> Result<FilterClause, BuildError> {
    let mut conditions = Vec::with_capacity(filters.len());
    let mut params = BoundParams::new();
    for (key, raw) in filters.iter() {
        let column = schema
            .column(key)
            .ok_or_else(|| BuildError::unknown(ColumnRole::Filter, vec![key.to_string()]))?;
        conditions.push(format!(
            "{key}={}",
            placeholder(key, &column.declared_type)
        ));
        params.bind(key, coerce(raw, column));
    }
    Ok(FilterClause {
        sql: conditions.join(" AND "),
        params,
    })
}
