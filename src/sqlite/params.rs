use rusqlite::types::Value;

use crate::types::{BoundParam, RowValues};

/// Convert bound parameters into `(":name", value)` pairs ready for
/// `rusqlite`'s named-parameter binding.
pub(crate) fn convert_params(params: &[BoundParam]) -> Vec<(String, Value)> {
    params
        .iter()
        .map(|param| (format!(":{}", param.bare_name()), to_sqlite_value(&param.value)))
        .collect()
}

fn to_sqlite_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) => Value::Real(*f),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Bool(b) => Value::Integer(i64::from(*b)),
        RowValues::Timestamp(ts) => Value::Text(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        RowValues::Null => Value::Null,
        RowValues::JSON(v) => Value::Text(v.to_string()),
        RowValues::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}

/// Extract a `RowValues` from a `SQLite` column value.
pub(crate) fn value_to_row_value(value: Value) -> RowValues {
    match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    }
}
