use thiserror::Error;

use crate::types::StatementKind;

/// Crate-wide error taxonomy.
///
/// Every failure is surfaced as a typed variant carrying enough context to
/// reproduce the problem (statement text, native error code, parameter name)
/// without re-deriving it from logs. Cache-subsystem failures are the one
/// exception to strict propagation: the cache is an optimization, so those
/// degrade to a miss and are only surfaced via `tracing` warnings.
#[derive(Debug, Error)]
pub enum DalError {
    /// The alias is not present in the alias registry.
    #[error("no database registered under alias '{0}'")]
    UnknownDatabase(String),

    /// The underlying driver failed to open (or keep) a connection.
    #[error("connection error: {0}")]
    ConnectionError(String),

    /// A mutation was attempted against an alias not marked writable.
    #[error("alias '{0}' is read only, no modifications allowed")]
    ReadOnlyViolation(String),

    /// The driver rejected a statement. Carries the native error code, the
    /// driver message, and the offending statement text.
    #[error("query failed ({code}): {message} [statement: {statement}]")]
    QueryError {
        message: String,
        code: String,
        statement: String,
    },

    /// A prepared-statement id was unknown, stale, or in the wrong state for
    /// the requested operation.
    #[error("no such prepared statement: {0}")]
    NoSuchStatement(String),

    /// A parameter could not be bound to a prepared statement.
    #[error("failed to bind parameter '{parameter}': {detail}")]
    BindError { parameter: String, detail: String },

    /// Caching was requested for a statement kind whose results must never
    /// be cached. Only `Select` results are cacheable; caching mutation
    /// outcomes risks replaying stale side-effect confirmations.
    #[error("cannot cache {0:?} statement results; only Select statements are cacheable")]
    UncacheableStatementType(StatementKind),

    /// Invalid or unusable configuration.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Envelope (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
