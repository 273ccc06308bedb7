mod envelope;
mod row;

pub use envelope::{ErrorDetail, ResultEnvelope};
pub use row::DbRow;

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::RowValues;

/// Rows materialized from one read query, before they are wrapped into a
/// [`ResultEnvelope`].
///
/// Column names are captured once and shared by every row.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    rows: Vec<DbRow>,
    column_names: Option<Arc<Vec<String>>>,
    column_index: Option<Arc<HashMap<String, usize>>>,
}

impl ResultSet {
    /// Create a result set with a known row-count estimate.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            rows: Vec::with_capacity(capacity),
            column_names: None,
            column_index: None,
        }
    }

    /// Set the column names shared by all rows. Must be called before rows
    /// are added.
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        let index = column_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect::<HashMap<_, _>>();
        self.column_index = Some(Arc::new(index));
        self.column_names = Some(column_names);
    }

    #[must_use]
    pub fn column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Add one row of values, in column order. Ignored if column names have
    /// not been set yet.
    pub fn add_row_values(&mut self, values: Vec<RowValues>) {
        if let (Some(names), Some(index)) = (&self.column_names, &self.column_index) {
            self.rows.push(DbRow {
                column_names: Arc::clone(names),
                values,
                column_index: Arc::clone(index),
            });
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn rows(&self) -> &[DbRow] {
        &self.rows
    }

    /// Consume the result set, yielding its rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<DbRow> {
        self.rows
    }
}
