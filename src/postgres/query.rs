use std::sync::Arc;

use chrono::NaiveDateTime;
use postgres::types::ToSql;
use postgres::{Client, Row};
use serde_json::Value;

use super::query_error;
use crate::error::DalError;
use crate::results::ResultSet;
use crate::translation::rewrite_named_placeholders;
use crate::types::{BoundParam, RowValues, StatementKind};

fn positional_refs<'a>(
    params: &'a [BoundParam],
    order: &[usize],
) -> Vec<&'a (dyn ToSql + Sync)> {
    order
        .iter()
        .map(|&idx| &params[idx].value as &(dyn ToSql + Sync))
        .collect()
}

/// Extract a [`RowValues`] from a Postgres row at the given index, matching
/// on the column's declared type.
fn extract_value(row: &Row, idx: usize) -> Result<RowValues, DalError> {
    let type_name = row.columns()[idx].type_().name().to_string();
    let wrap = |e: postgres::Error| DalError::QueryError {
        message: e.to_string(),
        code: "postgres".to_string(),
        statement: format!("<column {idx} of type {type_name}>"),
    };
    match type_name.as_str() {
        "int2" => {
            let val: Option<i16> = row.try_get(idx).map_err(wrap)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))))
        }
        "int4" => {
            let val: Option<i32> = row.try_get(idx).map_err(wrap)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))))
        }
        "int8" => {
            let val: Option<i64> = row.try_get(idx).map_err(wrap)?;
            Ok(val.map_or(RowValues::Null, RowValues::Int))
        }
        "float4" | "float8" => {
            let val: Option<f64> = row.try_get(idx).map_err(wrap)?;
            Ok(val.map_or(RowValues::Null, RowValues::Float))
        }
        "bool" => {
            let val: Option<bool> = row.try_get(idx).map_err(wrap)?;
            Ok(val.map_or(RowValues::Null, RowValues::Bool))
        }
        "timestamp" | "timestamptz" => {
            let val: Option<NaiveDateTime> = row.try_get(idx).map_err(wrap)?;
            Ok(val.map_or(RowValues::Null, RowValues::Timestamp))
        }
        "json" | "jsonb" => {
            let val: Option<Value> = row.try_get(idx).map_err(wrap)?;
            Ok(val.map_or(RowValues::Null, RowValues::JSON))
        }
        "bytea" => {
            let val: Option<Vec<u8>> = row.try_get(idx).map_err(wrap)?;
            Ok(val.map_or(RowValues::Null, RowValues::Blob))
        }
        // Anything else comes back as text
        _ => {
            let val: Option<String> = row.try_get(idx).map_err(wrap)?;
            Ok(val.map_or(RowValues::Null, RowValues::Text))
        }
    }
}

/// Run a read query and materialize every row into a [`ResultSet`].
pub(crate) fn execute_select(
    client: &mut Client,
    sql: &str,
    params: &[BoundParam],
) -> Result<ResultSet, DalError> {
    let (rewritten, order) = rewrite_named_placeholders(sql, params)?;
    let refs = positional_refs(params, &order);

    let stmt = client.prepare(&rewritten).map_err(|e| query_error(&e, sql))?;
    let column_names: Vec<String> = stmt
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();

    let rows = client
        .query(&stmt, refs.as_slice())
        .map_err(|e| query_error(&e, sql))?;

    let mut result_set = ResultSet::with_capacity(rows.len());
    result_set.set_column_names(Arc::new(column_names));
    for row in &rows {
        let col_count = row.columns().len();
        let mut values = Vec::with_capacity(col_count);
        for idx in 0..col_count {
            values.push(extract_value(row, idx)?);
        }
        result_set.add_row_values(values);
    }
    Ok(result_set)
}

/// Run a mutation, returning `(rows_affected, insert_id)`.
///
/// Postgres has no session-wide "last insert id"; callers that need
/// generated keys should use `RETURNING`, so the insert id here is always
/// `None`.
pub(crate) fn execute_dml(
    client: &mut Client,
    sql: &str,
    params: &[BoundParam],
    _kind: StatementKind,
) -> Result<(u64, Option<i64>), DalError> {
    let (rewritten, order) = rewrite_named_placeholders(sql, params)?;
    let refs = positional_refs(params, &order);
    let rows_affected = client
        .execute(&rewritten, refs.as_slice())
        .map_err(|e| query_error(&e, sql))?;
    Ok((rows_affected, None))
}
