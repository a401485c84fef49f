//! Runtime Table Schema
//!
//! Tables are not modelled statically. Every request works against the
//! column list the database reports for the table at that moment:
//!
//! - `ColumnType` - closed classification of a declared ClickHouse type tag
//! - `ColumnDescriptor` - one `(name, declared type)` pair in physical order
//! - `TableSchema` - ordered descriptors plus a name index for membership checks
//!
//! Declared types are classified once when the schema is built, so coercion
//! never re-matches type prefixes per value.

pub mod catalog;
pub mod coerce;

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

pub use catalog::{SchemaCatalog, SchemaError};
pub use coerce::{coerce, coerce_declared, NativeValue};

/// Classification of a declared database type.
///
/// Classification is by prefix of the declared tag, exactly as the coercion
/// policy requires: `UInt*` and `Int*` are integers, `Float*` is floating
/// point. Wrapped types such as `Nullable(Int64)` do not start with an
/// integer tag and therefore classify as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// `UInt8` .. `UInt256` (unsigned) and `Int8` .. `Int256` (signed)
    Integer { unsigned: bool },
    /// `Float32`, `Float64`
    Float,
    /// `String`
    String,
    /// `Date`, `Date32`, `DateTime`, `DateTime64(..)`
    DateTime,
    /// Everything else (Decimal, UUID, Enum, wrappers, ...)
    Other,
}

impl ColumnType {
    /// Classify a declared type tag.
    pub fn parse(declared: &str) -> Self {
        if declared.starts_with("UInt") {
            ColumnType::Integer { unsigned: true }
        } else if declared.starts_with("Int") {
            ColumnType::Integer { unsigned: false }
        } else if declared.starts_with("Float") {
            ColumnType::Float
        } else if declared.starts_with("String") {
            ColumnType::String
        } else if declared.starts_with("Date") {
            ColumnType::DateTime
        } else {
            ColumnType::Other
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer { .. } | ColumnType::Float)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer { unsigned: true } => write!(f, "unsigned integer"),
            ColumnType::Integer { unsigned: false } => write!(f, "integer"),
            ColumnType::Float => write!(f, "float"),
            ColumnType::String => write!(f, "string"),
            ColumnType::DateTime => write!(f, "datetime"),
            ColumnType::Other => write!(f, "other"),
        }
    }
}

/// A single column as reported by the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Native type tag, used verbatim in `{name:Type}` placeholders
    pub declared_type: String,
    #[serde(skip)]
    pub kind: ColumnType,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        let declared_type = declared_type.into();
        let kind = ColumnType::parse(&declared_type);
        Self {
            name: name.into(),
            declared_type,
            kind,
        }
    }
}

/// Ordered column list of one table, as fetched from the live database.
#[derive(Debug, Clone)]
pub struct TableSchema {
    table: String,
    columns: Vec<ColumnDescriptor>,
    index: HashMap<String, usize>,
}

impl TableSchema {
    /// Build a schema from descriptors in physical column order.
    ///
    /// If the backend ever reports a duplicate name, the first occurrence wins
    /// for lookups; the ordered list is kept as reported so row zipping still
    /// lines up with result tuples.
    pub fn new(table: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, col) in columns.iter().enumerate() {
            index.entry(col.name.clone()).or_insert(i);
        }
        Self {
            table: table.into(),
            columns,
            index,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    /// Declared type of `name`, if it is a member of this schema.
    pub fn declared_type(&self, name: &str) -> Option<&str> {
        self.column(name).map(|c| c.declared_type.as_str())
    }

    /// Column names in physical order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// `(name, declared type)` pairs in physical order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .map(|c| (c.name.as_str(), c.declared_type.as_str()))
    }

    /// Names from `names` that are not columns of this table, in input order.
    pub fn unknown_columns<'a, I>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .filter(|name| !self.contains(name))
            .map(str::to_string)
            .collect()
    }
}

/// Whether `name` can be used as a table reference without quoting.
///
/// Accepts `table` or `database.table` made of ASCII word characters, not
/// starting with a digit. Table names come straight from the URL path and
/// are interpolated into metadata statements, so anything else is refused
/// before reaching the backend.
pub fn is_valid_table_name(name: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
                .unwrap_or_else(|e| panic!("invalid table name pattern: {e}"))
        })
        .is_match(name)
}
