//! Per-request values: filter sets, mutation payloads and result rows.
//!
//! None of these outlive the request that produced them.

use serde_json::{Map, Value};
use thiserror::Error;

/// Body of a POST/PUT: column name to arbitrary JSON value.
pub type MutationPayload = Map<String, Value>;

/// One result row keyed by column name, in result column order.
pub type RowRecord = Map<String, Value>;

/// Equality filters from the query string, column name to raw text.
///
/// Keeps first-seen key order; a repeated key keeps its position and takes
/// the last value given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    entries: Vec<(String, String)>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut set = FilterSet::new();
        for (k, v) in pairs {
            set.insert(k, v);
        }
        set
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A result tuple whose width does not match the expected column list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("result row has {actual} values but {expected} columns were expected")]
pub struct RowShapeError {
    pub expected: usize,
    pub actual: usize,
}

/// Zip a raw result tuple against column names.
pub fn zip_row(columns: &[String], row: Vec<Value>) -> Result<RowRecord, RowShapeError> {
    if row.len() != columns.len() {
        return Err(RowShapeError {
            expected: columns.len(),
            actual: row.len(),
        });
    }
    Ok(columns.iter().cloned().zip(row).collect())
}

/// Zip every row, failing on the first mismatched width.
pub fn zip_rows(columns: &[String], rows: Vec<Vec<Value>>) -> Result<Vec<RowRecord>, RowShapeError> {
    rows.into_iter().map(|row| zip_row(columns, row)).collect()
}
