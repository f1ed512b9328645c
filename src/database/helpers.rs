// Value conversion between JSON parameters/rows and SQLite

use super::types::Row;
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::Value;

/// JSON parameter -> SQLite value. Booleans become 0/1; arrays and objects are
/// stored as their JSON text.
pub(crate) fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

/// SQLite column value -> JSON. Blobs are hex-encoded so every row is JSON-safe.
pub(crate) fn sql_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(hex::encode(bytes)),
    }
}

/// `name` -> `:name`; already-prefixed names (`:`, `@`, `$`) pass through
pub(crate) fn parameter_name(name: &str) -> String {
    if name.starts_with([':', '@', '$']) {
        name.to_string()
    } else {
        format!(":{name}")
    }
}

/// Text column, `None` for NULL or non-text values
pub fn row_str<'r>(row: &'r Row, column: &str) -> Option<&'r str> {
    row.get(column).and_then(Value::as_str)
}

/// Non-negative integer column that fits a line number
pub fn row_u32(row: &Row, column: &str) -> Option<u32> {
    row.get(column)
        .and_then(Value::as_i64)
        .and_then(|n| u32::try_from(n).ok())
}

pub fn row_i64(row: &Row, column: &str) -> Option<i64> {
    row.get(column).and_then(Value::as_i64)
}
