//! Query execution against the live connection.
//!
//! Every run opens the connection on demand, dispatches to the enabled
//! driver, and releases the connection on the way out — success or failure —
//! with the transaction flag suppressing the actual teardown. Driver
//! failures come back as [`DalError::QueryError`] carrying the native code,
//! message, and offending statement text. Timing is recorded for
//! observability only.

use std::time::Instant;

use tracing::debug;

use crate::config::AliasRegistry;
use crate::connection::{ConnectionManager, DbConnection};
use crate::error::DalError;
use crate::results::{ResultEnvelope, ResultSet};
use crate::types::{BoundParam, StatementKind};

pub(crate) fn dispatch_select(
    conn: &mut DbConnection,
    sql: &str,
    params: &[BoundParam],
) -> Result<ResultSet, DalError> {
    match conn {
        #[cfg(feature = "sqlite")]
        DbConnection::Sqlite(c) => crate::sqlite::execute_select(c, sql, params),
        #[cfg(feature = "postgres")]
        DbConnection::Postgres(c) => crate::postgres::execute_select(c, sql, params),
        #[allow(unreachable_patterns)]
        _ => Err(DalError::ConfigError(
            "no database driver is enabled in this build".to_string(),
        )),
    }
}

pub(crate) fn dispatch_dml(
    conn: &mut DbConnection,
    sql: &str,
    params: &[BoundParam],
    kind: StatementKind,
) -> Result<(u64, Option<i64>), DalError> {
    match conn {
        #[cfg(feature = "sqlite")]
        DbConnection::Sqlite(c) => crate::sqlite::execute_dml(c, sql, params, kind),
        #[cfg(feature = "postgres")]
        DbConnection::Postgres(c) => crate::postgres::execute_dml(c, sql, params, kind),
        #[allow(unreachable_patterns)]
        _ => Err(DalError::ConfigError(
            "no database driver is enabled in this build".to_string(),
        )),
    }
}

/// Execute a read statement and normalize the rows into an envelope.
pub(crate) fn run_select(
    manager: &mut ConnectionManager,
    registry: &AliasRegistry,
    sql: &str,
    params: &[BoundParam],
) -> Result<ResultEnvelope, DalError> {
    let started = Instant::now();
    let result = (|| -> Result<ResultEnvelope, DalError> {
        let conn = manager.ensure_connected(registry)?;
        let result_set = dispatch_select(conn, sql, params)?;
        Ok(ResultEnvelope::for_select(result_set))
    })();
    manager.release();
    debug!(
        statement = sql,
        elapsed_ms = started.elapsed().as_millis() as u64,
        ok = result.is_ok(),
        "select completed"
    );
    result
}

/// Execute a write statement. The target alias must be writable; this is
/// checked before any I/O is attempted.
pub(crate) fn run_mutation(
    manager: &mut ConnectionManager,
    registry: &AliasRegistry,
    sql: &str,
    params: &[BoundParam],
    kind: StatementKind,
) -> Result<ResultEnvelope, DalError> {
    let started = Instant::now();
    manager.require_writable(registry)?;
    let result = (|| -> Result<ResultEnvelope, DalError> {
        let conn = manager.ensure_connected(registry)?;
        let (rows_affected, insert_id) = dispatch_dml(conn, sql, params, kind)?;
        Ok(ResultEnvelope::for_mutation(rows_affected, insert_id))
    })();
    manager.release();
    debug!(
        statement = sql,
        elapsed_ms = started.elapsed().as_millis() as u64,
        ok = result.is_ok(),
        "mutation completed"
    );
    result
}

/// Execute a batch of statements without collecting results (DDL, setup
/// scripts). Requires a writable alias.
pub(crate) fn run_batch(
    manager: &mut ConnectionManager,
    registry: &AliasRegistry,
    sql: &str,
) -> Result<(), DalError> {
    manager.require_writable(registry)?;
    let result = (|| -> Result<(), DalError> {
        let conn = manager.ensure_connected(registry)?;
        conn.execute_batch(sql)
    })();
    manager.release();
    result
}
