//! Result formatting.
//!
//! Converts the canonical [`ResultEnvelope`] into the caller's requested
//! representation: the structured in-memory form (default), a JSON document
//! with the original wire keys (`result`, `cache`, `rows`, `rows_affected`,
//! `insertid`), or an XML document.

mod xml;

use serde_json::{Map, Value, json};

use crate::error::DalError;
use crate::results::ResultEnvelope;
use crate::types::{QueryStatus, ResultFormat, RowValues};

/// A formatted result.
#[derive(Debug, Clone)]
pub enum Formatted {
    Structured(ResultEnvelope),
    Json(String),
    Xml(String),
}

impl Formatted {
    /// The document text for the `Json`/`Xml` representations.
    #[must_use]
    pub fn as_document(&self) -> Option<&str> {
        match self {
            Formatted::Structured(_) => None,
            Formatted::Json(doc) | Formatted::Xml(doc) => Some(doc),
        }
    }
}

fn value_to_json(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => json!(i),
        RowValues::Float(f) => json!(f),
        RowValues::Text(s) => json!(s),
        RowValues::Bool(b) => json!(b),
        RowValues::Timestamp(ts) => json!(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        RowValues::Null => Value::Null,
        RowValues::JSON(v) => v.clone(),
        // Binary data has no JSON shape of its own; emit lowercase hex
        RowValues::Blob(_) => json!(value.to_string()),
    }
}

fn envelope_to_json(envelope: &ResultEnvelope) -> Result<String, DalError> {
    let mut doc = Map::new();
    let status = match envelope.status {
        QueryStatus::Ok => "ok",
        QueryStatus::Error => "error",
    };
    doc.insert("result".to_string(), json!(status));
    if let Some(state) = envelope.cache_state {
        doc.insert("cache".to_string(), json!(state.as_str()));
    }
    if let Some(rows) = &envelope.rows {
        let encoded: Vec<Value> = rows
            .iter()
            .map(|row| {
                let fields: Map<String, Value> = row
                    .iter()
                    .map(|(column, value)| (column.to_string(), value_to_json(value)))
                    .collect();
                Value::Object(fields)
            })
            .collect();
        doc.insert("rows".to_string(), Value::Array(encoded));
    }
    if let Some(rows_affected) = envelope.rows_affected {
        doc.insert("rows_affected".to_string(), json!(rows_affected));
    }
    if let Some(insert_id) = envelope.insert_id {
        doc.insert("insertid".to_string(), json!(insert_id));
    }
    if let Some(detail) = &envelope.error_detail {
        doc.insert("error".to_string(), serde_json::to_value(detail)?);
    }
    Ok(Value::Object(doc).to_string())
}

/// Render `envelope` in the requested representation.
///
/// # Errors
/// Returns [`DalError::Serialization`] if JSON encoding fails.
pub fn format_envelope(
    envelope: &ResultEnvelope,
    format: ResultFormat,
) -> Result<Formatted, DalError> {
    match format {
        ResultFormat::Structured => Ok(Formatted::Structured(envelope.clone())),
        ResultFormat::Json => Ok(Formatted::Json(envelope_to_json(envelope)?)),
        ResultFormat::Xml => Ok(Formatted::Xml(xml::render(envelope))),
    }
}
