//! Blocking cache-aside data access layer.
//!
//! One [`Dal`] instance owns one lazily-opened database connection and one
//! cache client, and unifies ad-hoc queries and prepared statements under a
//! single caching and result-formatting contract:
//!
//! - [`Dal::query_with_cache`] checks the cache first, falls back to the
//!   database on a miss, and populates the cache afterward (best-effort —
//!   the cache is an optimization, never a correctness dependency).
//! - Prepared statements ([`Dal::prepare`] / [`Dal::bind_and_execute`] /
//!   [`Dal::fetch`]) do the cache lookup at execute time and snapshot any
//!   hit into the handle, so an entry expiring between execute and fetch
//!   still serves the promised hit.
//! - Transactions pin the connection across operations until commit or
//!   rollback; outside one, the connection is released after every unit of
//!   work.
//!
//! Results come back as a canonical [`results::ResultEnvelope`] and can be
//! rendered structured, as JSON, or as XML via [`format::format_envelope`].

pub mod backend;
pub mod cache;
pub mod config;
pub mod connection;
pub mod dal;
pub mod error;
pub(crate) mod executor;
pub mod format;
pub mod keys;
pub mod results;
pub mod statement;
pub mod types;

#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "sqlite")]
mod sqlite;
#[cfg(feature = "postgres")]
mod translation;

pub mod prelude;

pub use crate::config::{
    AliasRegistry, CacheBackend, CacheSettings, ConnectionParams, DalConfig, DalConfigBuilder,
};
pub use crate::dal::Dal;
pub use crate::error::DalError;
pub use crate::format::{Formatted, format_envelope};
pub use crate::results::{DbRow, ResultEnvelope, ResultSet};
pub use crate::statement::{StatementId, StatementState};
pub use crate::types::{
    BoundParam, CacheState, DatabaseType, QueryStatus, ResultFormat, RowValues, StatementKind,
};
