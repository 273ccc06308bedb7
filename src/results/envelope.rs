use serde::{Deserialize, Serialize};

use super::{DbRow, ResultSet};
use crate::error::DalError;
use crate::types::{CacheState, QueryStatus};

/// Structured error context carried inside an error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub statement: Option<String>,
}

/// The canonical in-memory representation of a query's outcome.
///
/// Invariants: `rows` is present only for read operations; `rows_affected`
/// and `insert_id` only for write operations. `cache_state` is `None` on the
/// direct-execution path, where the cache is never consulted.
///
/// Envelopes serialize to opaque blobs for cache storage and deserialize
/// back without loss.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub status: QueryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<DbRow>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows_affected: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<ErrorDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_state: Option<CacheState>,
}

impl ResultEnvelope {
    /// Envelope for a completed read.
    #[must_use]
    pub fn for_select(result_set: ResultSet) -> Self {
        Self {
            status: QueryStatus::Ok,
            rows: Some(result_set.into_rows()),
            rows_affected: None,
            insert_id: None,
            error_detail: None,
            cache_state: None,
        }
    }

    /// Envelope for a completed write.
    #[must_use]
    pub fn for_mutation(rows_affected: u64, insert_id: Option<i64>) -> Self {
        Self {
            status: QueryStatus::Ok,
            rows: None,
            rows_affected: Some(rows_affected),
            insert_id,
            error_detail: None,
            cache_state: None,
        }
    }

    /// Envelope describing a failure, for callers that render errors through
    /// the result formatter instead of propagating them.
    #[must_use]
    pub fn for_error(error: &DalError) -> Self {
        let detail = match error {
            DalError::QueryError {
                message,
                code,
                statement,
            } => ErrorDetail {
                message: message.clone(),
                code: Some(code.clone()),
                statement: Some(statement.clone()),
            },
            other => ErrorDetail {
                message: other.to_string(),
                code: None,
                statement: None,
            },
        };
        Self {
            status: QueryStatus::Error,
            rows: None,
            rows_affected: None,
            insert_id: None,
            error_detail: Some(detail),
            cache_state: None,
        }
    }

    /// Tag where this result came from, relative to the cache.
    #[must_use]
    pub fn with_cache_state(mut self, state: CacheState) -> Self {
        self.cache_state = Some(state);
        self
    }

    /// Number of rows carried by this envelope (0 for write results).
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.as_ref().map_or(0, Vec::len)
    }

    /// First row, if any.
    #[must_use]
    pub fn first_row(&self) -> Option<&DbRow> {
        self.rows.as_ref().and_then(|rows| rows.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RowValues;
    use std::sync::Arc;

    #[test]
    fn envelope_round_trips_through_serde() {
        let mut set = ResultSet::with_capacity(1);
        set.set_column_names(Arc::new(vec!["sum".to_string()]));
        set.add_row_values(vec![RowValues::Int(2)]);
        let envelope = ResultEnvelope::for_select(set).with_cache_state(CacheState::Miss);

        let bytes = serde_json::to_vec(&envelope).expect("serialize");
        let back: ResultEnvelope = serde_json::from_slice(&bytes).expect("deserialize");

        assert_eq!(back.status, QueryStatus::Ok);
        assert_eq!(back.cache_state, Some(CacheState::Miss));
        let row = back.first_row().expect("one row");
        // The lookup cache is not serialized; named access must still work.
        assert_eq!(row.get("sum"), Some(&RowValues::Int(2)));
    }
}
