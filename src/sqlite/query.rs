use std::sync::Arc;

use rusqlite::types::Value;
use rusqlite::{Connection, Statement, ToSql};

use super::{convert_params, query_error, value_to_row_value};
use crate::error::DalError;
use crate::results::ResultSet;
use crate::types::{BoundParam, StatementKind};

/// Check every bound name against the statement and every statement
/// placeholder against the bindings, so a typo fails as a typed
/// [`DalError::BindError`] instead of silently binding NULL.
fn validate_bindings(
    stmt: &Statement<'_>,
    converted: &[(String, Value)],
) -> Result<(), DalError> {
    for (placeholder, _) in converted {
        let known = stmt
            .parameter_index(placeholder)
            .map_err(|e| DalError::BindError {
                parameter: placeholder.clone(),
                detail: e.to_string(),
            })?;
        if known.is_none() {
            return Err(DalError::BindError {
                parameter: placeholder.clone(),
                detail: "statement has no such parameter".to_string(),
            });
        }
    }
    let expected = stmt.parameter_count();
    if expected != converted.len() {
        // Name the first placeholder nothing was bound for.
        for idx in 1..=expected {
            if let Some(name) = stmt.parameter_name(idx) {
                if !converted.iter().any(|(bound, _)| bound == name) {
                    return Err(DalError::BindError {
                        parameter: name.to_string(),
                        detail: "no value bound for this parameter".to_string(),
                    });
                }
            }
        }
        return Err(DalError::BindError {
            parameter: "?".to_string(),
            detail: format!(
                "statement expects {expected} parameters but {} were bound",
                converted.len()
            ),
        });
    }
    Ok(())
}

fn param_refs<'a>(converted: &'a [(String, Value)]) -> Vec<(&'a str, &'a dyn ToSql)> {
    converted
        .iter()
        .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
        .collect()
}

/// Run a read query and materialize every row into a [`ResultSet`].
pub(crate) fn execute_select(
    conn: &Connection,
    sql: &str,
    params: &[BoundParam],
) -> Result<ResultSet, DalError> {
    let converted = convert_params(params);
    let mut stmt = conn.prepare(sql).map_err(|e| query_error(&e, sql))?;
    validate_bindings(&stmt, &converted)?;

    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(ToString::to_string)
        .collect();
    let mut result_set = ResultSet::with_capacity(16);
    result_set.set_column_names(Arc::new(column_names));

    let refs = param_refs(&converted);
    let mut rows = stmt
        .query(refs.as_slice())
        .map_err(|e| query_error(&e, sql))?;
    while let Some(row) = rows.next().map_err(|e| query_error(&e, sql))? {
        let col_count = result_set
            .column_names()
            .map_or(0, |names| names.len());
        let mut values = Vec::with_capacity(col_count);
        for idx in 0..col_count {
            let value: Value = row.get(idx).map_err(|e| query_error(&e, sql))?;
            values.push(value_to_row_value(value));
        }
        result_set.add_row_values(values);
    }
    Ok(result_set)
}

/// Run a mutation, returning `(rows_affected, insert_id)`. The insert id is
/// only meaningful for `Insert` statements.
pub(crate) fn execute_dml(
    conn: &Connection,
    sql: &str,
    params: &[BoundParam],
    kind: StatementKind,
) -> Result<(u64, Option<i64>), DalError> {
    let converted = convert_params(params);
    let rows_affected = {
        let mut stmt = conn.prepare(sql).map_err(|e| query_error(&e, sql))?;
        validate_bindings(&stmt, &converted)?;
        let refs = param_refs(&converted);
        stmt.execute(refs.as_slice())
            .map_err(|e| query_error(&e, sql))? as u64
    };
    let insert_id = if kind == StatementKind::Insert {
        Some(conn.last_insert_rowid())
    } else {
        None
    };
    Ok((rows_affected, insert_id))
}
