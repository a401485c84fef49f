//! Value Coercion
//!
//! Converts untyped wire values (query-string text, JSON payload fields) into
//! native values for bound parameters.
//!
//! Coercion is best effort: text that does not parse as the column's numeric
//! type is passed through unchanged and a warning is logged. The backend then
//! rejects the value when it binds it to the typed placeholder.

use std::fmt;

use super::{ColumnDescriptor, ColumnType};

/// A value ready to be bound to a named statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Int(i128),
    Float(f64),
    Text(String),
    /// Caller-supplied JSON, bound as-is (mutation payload fields)
    Json(serde_json::Value),
}

impl NativeValue {
    /// Render in the backend's text format for parameter binding.
    ///
    /// Parameters are read as escaped text: strings have backslash, quote
    /// and control characters escaped, so only a JSON null becomes `\N`.
    /// Numbers are decimal and booleans `1`/`0`. Arrays and objects become
    /// array and map literals with quoted strings.
    pub fn to_param_text(&self) -> String {
        match self {
            NativeValue::Int(i) => i.to_string(),
            NativeValue::Float(f) => f.to_string(),
            NativeValue::Text(s) => escape_text(s),
            NativeValue::Json(v) => match v {
                serde_json::Value::Null => "\\N".to_string(),
                serde_json::Value::String(s) => escape_text(s),
                other => literal(other),
            },
        }
    }
}

/// Escape `s` for the backend's text format.
fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out
}

/// Literal form of a JSON value; strings nested in compound values are quoted.
fn literal(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => format!("'{}'", escape_text(s)),
        serde_json::Value::Array(items) => {
            let items: Vec<String> = items.iter().map(literal).collect();
            format!("[{}]", items.join(","))
        }
        serde_json::Value::Object(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("'{}':{}", escape_text(k), literal(v)))
                .collect();
            format!("{{{}}}", entries.join(","))
        }
    }
}

impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_param_text())
    }
}

impl From<serde_json::Value> for NativeValue {
    fn from(v: serde_json::Value) -> Self {
        NativeValue::Json(v)
    }
}

/// Coerce raw text into the native type implied by `column`.
pub fn coerce(raw: &str, column: &ColumnDescriptor) -> NativeValue {
    match column.kind {
        ColumnType::Integer { .. } => match parse_integer(raw) {
            Some(i) => NativeValue::Int(i),
            None => fallback(raw, column),
        },
        ColumnType::Float => match raw.trim().parse::<f64>() {
            Ok(f) => NativeValue::Float(f),
            Err(_) => fallback(raw, column),
        },
        ColumnType::String | ColumnType::DateTime | ColumnType::Other => {
            NativeValue::Text(raw.to_string())
        }
    }
}

/// Coerce against a bare declared type tag (e.g. `"UInt64"`).
pub fn coerce_declared(raw: &str, declared_type: &str) -> NativeValue {
    coerce(raw, &ColumnDescriptor::new("", declared_type))
}

fn parse_integer(raw: &str) -> Option<i128> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    digits.parse::<i128>().ok()
}

fn fallback(raw: &str, column: &ColumnDescriptor) -> NativeValue {
    tracing::warn!(
        value = %raw,
        column = %column.name,
        declared_type = %column.declared_type,
        "cannot coerce value, passing through as text"
    );
    NativeValue::Text(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_coerce_unsigned_integer() {
        assert_eq!(coerce_declared("42", "UInt64"), NativeValue::Int(42));
        assert_eq!(coerce_declared("0", "UInt8"), NativeValue::Int(0));
    }

    #[test]
    fn test_coerce_signed_integer() {
        assert_eq!(coerce_declared("-17", "Int32"), NativeValue::Int(-17));
        assert_eq!(coerce_declared("+5", "Int64"), NativeValue::Int(5));
        assert_eq!(coerce_declared(" 7 ", "Int64"), NativeValue::Int(7));
    }

    #[test]
    fn test_coerce_wide_integer() {
        assert_eq!(
            coerce_declared("18446744073709551615", "UInt64"),
            NativeValue::Int(i128::from(u64::MAX))
        );
    }

    #[test]
    fn test_coerce_float() {
        assert_eq!(coerce_declared("3.5", "Float64"), NativeValue::Float(3.5));
        assert_eq!(coerce_declared("1e3", "Float32"), NativeValue::Float(1000.0));
        assert_eq!(coerce_declared("2", "Float64"), NativeValue::Float(2.0));
    }

    /// Unparseable numeric text is passed through, not rejected.
    #[test]
    fn test_coerce_best_effort_integer_passthrough() {
        assert_eq!(
            coerce_declared("abc", "UInt64"),
            NativeValue::Text("abc".to_string())
        );
        assert_eq!(
            coerce_declared("1.5", "Int32"),
            NativeValue::Text("1.5".to_string())
        );
    }

    #[test]
    fn test_coerce_best_effort_float_passthrough() {
        assert_eq!(
            coerce_declared("not-a-number", "Float64"),
            NativeValue::Text("not-a-number".to_string())
        );
    }

    #[test]
    fn test_coerce_non_numeric_types_passthrough() {
        assert_eq!(
            coerce_declared("active", "String"),
            NativeValue::Text("active".to_string())
        );
        assert_eq!(
            coerce_declared("2024-01-02 03:04:05", "DateTime"),
            NativeValue::Text("2024-01-02 03:04:05".to_string())
        );
        assert_eq!(
            coerce_declared("12", "Nullable(Int64)"),
            NativeValue::Text("12".to_string())
        );
    }

    #[test]
    fn test_param_text_rendering() {
        assert_eq!(NativeValue::Int(-3).to_param_text(), "-3");
        assert_eq!(NativeValue::Float(2.5).to_param_text(), "2.5");
        assert_eq!(NativeValue::Text("a b".into()).to_param_text(), "a b");
        assert_eq!(NativeValue::Json(json!(null)).to_param_text(), "\\N");
        assert_eq!(NativeValue::Json(json!(true)).to_param_text(), "1");
        assert_eq!(NativeValue::Json(json!(false)).to_param_text(), "0");
        assert_eq!(NativeValue::Json(json!(12)).to_param_text(), "12");
        assert_eq!(NativeValue::Json(json!("x")).to_param_text(), "x");
        assert_eq!(NativeValue::Json(json!([1, 2])).to_param_text(), "[1,2]");
    }

    #[test]
    fn test_param_text_escapes_backslash_sequences() {
        assert_eq!(NativeValue::Text("C:\\new".into()).to_param_text(), "C:\\\\new");
        assert_eq!(NativeValue::Text("\\N".into()).to_param_text(), "\\\\N");
        assert_eq!(NativeValue::Text("a\tb".into()).to_param_text(), "a\\tb");
        assert_eq!(NativeValue::Text("x\ny\r".into()).to_param_text(), "x\\ny\\r");
        assert_eq!(NativeValue::Text("it's".into()).to_param_text(), "it\\'s");
    }

    #[test]
    fn test_json_string_escaped_like_text() {
        assert_eq!(NativeValue::Json(json!("C:\\new")).to_param_text(), "C:\\\\new");
        // Only a real null is sent as the null marker
        assert_eq!(NativeValue::Json(json!("\\N")).to_param_text(), "\\\\N");
        assert_ne!(
            NativeValue::Json(json!("\\N")).to_param_text(),
            NativeValue::Json(json!(null)).to_param_text()
        );
    }

    #[test]
    fn test_compound_values_use_quoted_literals() {
        assert_eq!(
            NativeValue::Json(json!(["a", "b'c", null, true])).to_param_text(),
            "['a','b\\'c',NULL,1]"
        );
        assert_eq!(
            NativeValue::Json(json!({"k": "v\tw", "n": 2})).to_param_text(),
            "{'k':'v\\tw','n':2}"
        );
        assert_eq!(
            NativeValue::Json(json!([["x"], []])).to_param_text(),
            "[['x'],[]]"
        );
    }

    proptest! {
        #[test]
        fn prop_coerce_never_panics(raw in ".*", declared in "(UInt|Int|Float|String|Date)[0-9]{0,3}") {
            let _ = coerce_declared(&raw, &declared);
        }

        #[test]
        fn prop_integer_roundtrip(n in any::<i64>()) {
            prop_assert_eq!(coerce_declared(&n.to_string(), "Int64"), NativeValue::Int(i128::from(n)));
        }
    }
}
