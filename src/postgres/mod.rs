//! `PostgreSQL` driver glue.

mod params;
mod query;

pub(crate) use query::{execute_dml, execute_select};

use crate::config::ConnectionParams;
use crate::error::DalError;

/// Open a `PostgreSQL` client for the given alias parameters.
///
/// The address accepts either a `postgres://` URL or keyword/value form;
/// alias-level credentials override whatever the address carries. The
/// `persistent` hint maps to TCP keepalives.
pub(crate) fn open(params: &ConnectionParams) -> Result<postgres::Client, DalError> {
    let mut config: postgres::Config = params.address.parse().map_err(|e| {
        DalError::ConnectionError(format!(
            "invalid PostgreSQL address '{}': {e}",
            params.address
        ))
    })?;
    if let Some(user) = &params.user {
        config.user(user);
    }
    if let Some(password) = &params.password {
        config.password(password);
    }
    config.keepalives(params.persistent);
    config
        .connect(postgres::NoTls)
        .map_err(|e| DalError::ConnectionError(format!("could not connect to the DB: {e}")))
}

/// Wrap a driver failure into [`DalError::QueryError`], keeping the
/// SQLSTATE code and the offending statement text.
pub(crate) fn query_error(err: &postgres::Error, sql: &str) -> DalError {
    let (message, code) = match err.as_db_error() {
        Some(db_err) => (db_err.message().to_string(), db_err.code().code().to_string()),
        None => (err.to_string(), "postgres".to_string()),
    };
    DalError::QueryError {
        message,
        code,
        statement: sql.to_string(),
    }
}
