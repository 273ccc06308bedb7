//! `SQLite` driver glue.

mod params;
mod query;

pub(crate) use params::{convert_params, value_to_row_value};
pub(crate) use query::{execute_dml, execute_select};

use rusqlite::{Connection, OpenFlags};

use crate::config::ConnectionParams;
use crate::error::DalError;

/// Open a `SQLite` connection for the given alias parameters.
///
/// Read-only aliases are also opened with the driver-level read-only flag,
/// so a mutation that slips past the capability check still cannot write.
/// The `persistent` hint has no meaning for an in-process database.
pub(crate) fn open(params: &ConnectionParams) -> Result<Connection, DalError> {
    let flags = if params.writable {
        OpenFlags::default()
    } else {
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX
    };
    Connection::open_with_flags(&params.address, flags).map_err(|e| {
        DalError::ConnectionError(format!("could not open SQLite db '{}': {e}", params.address))
    })
}

/// Wrap a driver failure into [`DalError::QueryError`], keeping the native
/// extended result code and the offending statement text.
pub(crate) fn query_error(err: &rusqlite::Error, sql: &str) -> DalError {
    match err {
        rusqlite::Error::SqliteFailure(ffi_err, message) => DalError::QueryError {
            message: message
                .clone()
                .unwrap_or_else(|| ffi_err.to_string()),
            code: ffi_err.extended_code.to_string(),
            statement: sql.to_string(),
        },
        other => DalError::QueryError {
            message: other.to_string(),
            code: "sqlite".to_string(),
            statement: sql.to_string(),
        },
    }
}
