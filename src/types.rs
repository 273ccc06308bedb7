use std::fmt;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Values that can be stored in a database row or used as bound parameters.
///
/// The same enum is used across backends so callers never branch on driver
/// types:
/// ```rust
/// use sql_cache_dal::prelude::*;
///
/// let params = vec![
///     BoundParam::new(":id", RowValues::Int(1)),
///     BoundParam::new(":name", RowValues::Text("alice".into())),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            // Try "YYYY-MM-DD HH:MM:SS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            // Try "YYYY-MM-DD HH:MM:SS.SSS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S.%3f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }
}

/// Textual form used when folding a bound value into a cache key. Stable
/// across runs; not meant for display to end users.
impl fmt::Display for RowValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowValues::Int(i) => write!(f, "{i}"),
            RowValues::Float(v) => write!(f, "{v}"),
            RowValues::Text(s) => write!(f, "{s}"),
            RowValues::Bool(b) => write!(f, "{b}"),
            RowValues::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f")),
            RowValues::Null => write!(f, "NULL"),
            RowValues::JSON(v) => write!(f, "{v}"),
            RowValues::Blob(bytes) => {
                for byte in bytes {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

/// A named parameter bound to a prepared statement placeholder.
///
/// Names may be written with or without the leading `:`; `":id"` and `"id"`
/// address the same placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundParam {
    /// Placeholder name as written by the caller
    pub name: String,
    /// The value to bind
    pub value: RowValues,
}

impl BoundParam {
    pub fn new(name: impl Into<String>, value: RowValues) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Placeholder name without the leading `:`.
    #[must_use]
    pub fn bare_name(&self) -> &str {
        self.name.strip_prefix(':').unwrap_or(&self.name)
    }
}

/// The database type a registered alias points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// `SQLite` database
    #[cfg(feature = "sqlite")]
    Sqlite,
    /// `PostgreSQL` database
    #[cfg(feature = "postgres")]
    Postgres,
}

/// The kind of statement being prepared or executed.
///
/// Mirrors the verb of the underlying SQL; only `Select` results are ever
/// cacheable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    /// Whether this kind reads rows (as opposed to mutating).
    #[must_use]
    pub fn is_select(&self) -> bool {
        matches!(self, Self::Select)
    }
}

/// Where a result came from, relative to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    /// Served from the cache without touching the database
    Hit,
    /// Cache was consulted, entry was absent; result came from the database
    Miss,
    /// Caching is administratively disabled; the cache was never consulted
    Disabled,
}

impl CacheState {
    /// Wire form used by the JSON/XML formatters.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheState::Hit => "hit",
            CacheState::Miss => "miss",
            CacheState::Disabled => "disabled",
        }
    }
}

/// Overall outcome recorded in a result envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Ok,
    Error,
}

/// Output representation for a result envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResultFormat {
    /// The in-memory envelope, unchanged
    Structured,
    /// A JSON document with top-level `result`/`cache`/`rows` keys
    Json,
    /// An XML document: `<xml><result>…</result><rows><row>…</row></rows></xml>`
    Xml,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_name_strips_colon_prefix() {
        assert_eq!(BoundParam::new(":a", RowValues::Int(1)).bare_name(), "a");
        assert_eq!(BoundParam::new("a", RowValues::Int(1)).bare_name(), "a");
    }

    #[test]
    fn lenient_bool_accessor() {
        assert_eq!(RowValues::Int(1).as_bool(), Some(&true));
        assert_eq!(RowValues::Int(0).as_bool(), Some(&false));
        assert_eq!(RowValues::Int(7).as_bool(), None);
    }
}
