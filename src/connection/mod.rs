//! Connection lifecycle.
//!
//! A DAL instance owns at most one live connection, opened lazily and closed
//! after each unit of work unless a transaction is open. The manager is an
//! explicit Closed → Open → Closed handle: `connect` only records the target
//! alias (so a cache hit never opens a connection), `ensure_connected` opens
//! on demand, and `release` is invoked on every exit path with the
//! transaction flag suppressing teardown until commit/rollback.

use tracing::{debug, error};

use crate::config::{AliasRegistry, ConnectionParams};
use crate::error::DalError;
use crate::types::DatabaseType;

/// An open link to one database, generic over the enabled drivers.
pub enum DbConnection {
    /// `SQLite` database connection
    #[cfg(feature = "sqlite")]
    Sqlite(rusqlite::Connection),
    /// `PostgreSQL` client connection
    #[cfg(feature = "postgres")]
    Postgres(postgres::Client),
}

impl std::fmt::Debug for DbConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "sqlite")]
            DbConnection::Sqlite(_) => f.write_str("DbConnection::Sqlite"),
            #[cfg(feature = "postgres")]
            DbConnection::Postgres(_) => f.write_str("DbConnection::Postgres"),
            #[allow(unreachable_patterns)]
            _ => f.write_str("DbConnection"),
        }
    }
}

impl DbConnection {
    /// Run a batch of statements without collecting results.
    ///
    /// # Errors
    /// Returns [`DalError::QueryError`] if the driver rejects the batch.
    pub(crate) fn execute_batch(&mut self, sql: &str) -> Result<(), DalError> {
        match self {
            #[cfg(feature = "sqlite")]
            DbConnection::Sqlite(conn) => conn
                .execute_batch(sql)
                .map_err(|e| crate::sqlite::query_error(&e, sql)),
            #[cfg(feature = "postgres")]
            DbConnection::Postgres(client) => client
                .batch_execute(sql)
                .map_err(|e| crate::postgres::query_error(&e, sql)),
            #[allow(unreachable_patterns)]
            _ => Err(DalError::ConfigError(
                "no database driver is enabled in this build".to_string(),
            )),
        }
    }
}

fn open(params: &ConnectionParams) -> Result<DbConnection, DalError> {
    match params.database_type {
        #[cfg(feature = "sqlite")]
        DatabaseType::Sqlite => Ok(DbConnection::Sqlite(crate::sqlite::open(params)?)),
        #[cfg(feature = "postgres")]
        DatabaseType::Postgres => Ok(DbConnection::Postgres(crate::postgres::open(params)?)),
    }
}

/// Lazily opens and tears down the single connection a DAL instance owns.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    target: Option<String>,
    conn: Option<DbConnection>,
    in_transaction: bool,
}

impl ConnectionManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `alias` as the target database. Performs no I/O — the actual
    /// connection is opened by [`ConnectionManager::ensure_connected`] only
    /// when a result cannot be served from cache.
    ///
    /// # Errors
    /// Returns [`DalError::UnknownDatabase`] if the alias is unregistered,
    /// or [`DalError::ConnectionError`] when retargeting away from an alias
    /// with an open transaction.
    pub fn connect(&mut self, registry: &AliasRegistry, alias: &str) -> Result<(), DalError> {
        registry.get(alias)?;
        if self.target.as_deref() == Some(alias) {
            return Ok(());
        }
        if self.in_transaction {
            return Err(DalError::ConnectionError(format!(
                "cannot retarget alias '{alias}' while a transaction is open on '{}'",
                self.target.as_deref().unwrap_or("<none>")
            )));
        }
        // Retargeting closes any link to the previous alias.
        self.conn = None;
        self.target = Some(alias.to_string());
        Ok(())
    }

    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Parameters of the current target alias.
    ///
    /// # Errors
    /// Returns [`DalError::ConnectionError`] when no alias has been selected
    /// and [`DalError::UnknownDatabase`] when the selection is stale.
    pub fn target_params<'a>(
        &self,
        registry: &'a AliasRegistry,
    ) -> Result<&'a ConnectionParams, DalError> {
        let alias = self.target.as_deref().ok_or_else(|| {
            DalError::ConnectionError("no database selected; call connect(alias) first".into())
        })?;
        registry.get(alias)
    }

    /// Fail with [`DalError::ReadOnlyViolation`] unless the target alias
    /// allows mutations. Checked before any I/O is attempted.
    pub fn require_writable(&self, registry: &AliasRegistry) -> Result<(), DalError> {
        let params = self.target_params(registry)?;
        if params.writable {
            Ok(())
        } else {
            let alias = self.target.as_deref().unwrap_or_default().to_string();
            Err(DalError::ReadOnlyViolation(alias))
        }
    }

    /// Open the connection if none is open, using the target alias's
    /// registered parameters.
    ///
    /// # Errors
    /// Returns [`DalError::ConnectionError`] (carrying the driver message)
    /// if the open fails, [`DalError::UnknownDatabase`] if the target alias
    /// is unregistered.
    pub fn ensure_connected(
        &mut self,
        registry: &AliasRegistry,
    ) -> Result<&mut DbConnection, DalError> {
        if self.conn.is_none() {
            let params = self.target_params(registry)?;
            match open(params) {
                Ok(conn) => {
                    debug!(alias = self.target.as_deref(), "opened database connection");
                    self.conn = Some(conn);
                }
                Err(err) => {
                    error!(alias = self.target.as_deref(), %err, "database connect failed");
                    return Err(err);
                }
            }
        }
        self.conn
            .as_mut()
            .ok_or_else(|| DalError::ConnectionError("connection unavailable".into()))
    }

    /// Close the connection unless a transaction is open; a no-op otherwise.
    pub fn release(&mut self) {
        if self.in_transaction {
            return;
        }
        if self.conn.take().is_some() {
            debug!(alias = self.target.as_deref(), "released database connection");
        }
    }

    /// Open a transaction on the target database. While it is open,
    /// [`ConnectionManager::release`] keeps the connection alive.
    ///
    /// # Errors
    /// Fails if a transaction is already open, the alias is unknown, or the
    /// driver rejects `BEGIN`.
    pub fn begin_transaction(&mut self, registry: &AliasRegistry) -> Result<(), DalError> {
        if self.in_transaction {
            return Err(DalError::ConnectionError(
                "a transaction is already open on this instance".into(),
            ));
        }
        let conn = self.ensure_connected(registry)?;
        conn.execute_batch("BEGIN")?;
        self.in_transaction = true;
        debug!(alias = self.target.as_deref(), "transaction started");
        Ok(())
    }

    /// Commit the open transaction and release the connection.
    ///
    /// # Errors
    /// Fails if no transaction is open or the driver rejects `COMMIT`.
    pub fn commit(&mut self) -> Result<(), DalError> {
        self.close_transaction("COMMIT")
    }

    /// Roll back the open transaction and release the connection.
    ///
    /// # Errors
    /// Fails if no transaction is open or the driver rejects `ROLLBACK`.
    pub fn rollback(&mut self) -> Result<(), DalError> {
        self.close_transaction("ROLLBACK")
    }

    fn close_transaction(&mut self, verb: &str) -> Result<(), DalError> {
        if !self.in_transaction {
            return Err(DalError::ConnectionError(
                "no transaction is open on this instance".into(),
            ));
        }
        let conn = self.conn.as_mut().ok_or_else(|| {
            DalError::ConnectionError("transaction open but connection is gone".into())
        })?;
        let result = conn.execute_batch(verb);
        // The transaction is over either way; teardown must not be skipped
        // on a failed COMMIT.
        self.in_transaction = false;
        self.release();
        debug!(alias = self.target.as_deref(), verb, "transaction closed");
        result
    }
}
