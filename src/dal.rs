//! The DAL instance: cache-aside orchestration over one connection, one
//! cache client, and the prepared-statement registry.

use std::time::Instant;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::backend::{Backend, BackendRead, BackendRegistry, QuerySpec};
use crate::cache::CacheStore;
use crate::config::{AliasRegistry, DalConfig};
use crate::connection::ConnectionManager;
use crate::error::DalError;
use crate::executor;
use crate::format::{Formatted, format_envelope};
use crate::keys;
use crate::results::ResultEnvelope;
use crate::statement::{StatementId, StatementRegistry, StatementState};
use crate::types::{BoundParam, CacheState, ResultFormat, StatementKind};

/// A data-access-layer instance.
///
/// One instance owns at most one live database connection and one cache
/// client. Operations execute in the order invoked, blocking until done; an
/// instance is not meant for concurrent sharing — callers needing
/// concurrency use independent instances or wrap one in a mutex.
///
/// ```rust
/// use sql_cache_dal::prelude::*;
///
/// # fn main() -> Result<(), DalError> {
/// let config = DalConfig::builder()
///     .alias("primary", ConnectionParams::sqlite(":memory:"))
///     .cache(CacheSettings::in_process())
///     .build();
/// let mut dal = Dal::new(config);
/// dal.connect("primary")?;
///
/// let first = dal.query_with_cache("SELECT 1+1 AS sum", 120)?;
/// assert_eq!(first.cache_state, Some(CacheState::Miss));
///
/// let second = dal.query_with_cache("SELECT 1+1 AS sum", 120)?;
/// assert_eq!(second.cache_state, Some(CacheState::Hit));
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct Dal {
    registry: AliasRegistry,
    manager: ConnectionManager,
    cache: CacheStore,
    statements: StatementRegistry,
    backends: BackendRegistry,
}

impl Dal {
    /// Build an instance from an explicit configuration. Nothing is opened
    /// yet; both the database connection and the cache client are created
    /// lazily on first use.
    #[must_use]
    pub fn new(config: DalConfig) -> Self {
        Self {
            registry: config.aliases,
            manager: ConnectionManager::new(),
            cache: CacheStore::new(config.cache),
            statements: StatementRegistry::default(),
            backends: BackendRegistry::new(),
        }
    }

    /// Select the database to operate against. Performs no I/O, so a
    /// subsequent cache hit never opens a connection.
    ///
    /// # Errors
    /// Returns [`DalError::UnknownDatabase`] if `alias` is unregistered.
    pub fn connect(&mut self, alias: &str) -> Result<(), DalError> {
        self.manager.connect(&self.registry, alias)
    }

    #[must_use]
    pub fn cache_enabled(&self) -> bool {
        self.cache.is_enabled()
    }

    /// Run a read query through the cache: check first, execute and
    /// populate on a miss, short-circuit on a hit.
    ///
    /// The result is tagged `Hit`, `Miss`, or `Disabled`. A failed cache
    /// write is logged and never fails the call; query errors propagate
    /// unchanged and are never cached.
    ///
    /// # Errors
    /// Propagates connection and query failures from the database path.
    pub fn query_with_cache(
        &mut self,
        sql: &str,
        ttl_seconds: u32,
    ) -> Result<ResultEnvelope, DalError> {
        let started = Instant::now();
        if !self.cache.is_enabled() {
            let envelope = executor::run_select(&mut self.manager, &self.registry, sql, &[])?;
            debug!(
                statement = sql,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "cache is off, retrieved from database"
            );
            return Ok(envelope.with_cache_state(CacheState::Disabled));
        }

        let key = keys::query_key(sql);
        if let Some(envelope) = self.cache.get_object::<ResultEnvelope>(&key) {
            debug!(
                statement = sql,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "found in cache"
            );
            return Ok(envelope.with_cache_state(CacheState::Hit));
        }

        let envelope = executor::run_select(&mut self.manager, &self.registry, sql, &[])?
            .with_cache_state(CacheState::Miss);
        self.cache.put_object(&key, &envelope, ttl_seconds);
        debug!(
            statement = sql,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "not found in cache, retrieved from database"
        );
        Ok(envelope)
    }

    /// Like [`Dal::query_with_cache`], rendered in the requested
    /// representation.
    ///
    /// # Errors
    /// Propagates database failures and JSON encoding failures.
    pub fn query_with_cache_as(
        &mut self,
        sql: &str,
        ttl_seconds: u32,
        format: ResultFormat,
    ) -> Result<Formatted, DalError> {
        let envelope = self.query_with_cache(sql, ttl_seconds)?;
        format_envelope(&envelope, format)
    }

    /// Run a statement directly against the database, bypassing the cache.
    ///
    /// Reads return rows; mutations require a writable alias and return
    /// `rows_affected` (plus `insert_id` for inserts, where the driver
    /// reports one).
    ///
    /// # Errors
    /// Returns [`DalError::ReadOnlyViolation`] for mutations against a
    /// read-only alias, otherwise propagates connection and query failures.
    pub fn query(&mut self, sql: &str, kind: StatementKind) -> Result<ResultEnvelope, DalError> {
        if kind.is_select() {
            executor::run_select(&mut self.manager, &self.registry, sql, &[])
        } else {
            executor::run_mutation(&mut self.manager, &self.registry, sql, &[], kind)
        }
    }

    /// Run a batch of statements (DDL, setup scripts) without collecting
    /// results. Requires a writable alias.
    ///
    /// # Errors
    /// Propagates connection and query failures.
    pub fn execute_batch(&mut self, sql: &str) -> Result<(), DalError> {
        executor::run_batch(&mut self.manager, &self.registry, sql)
    }

    /// Run an innocuous query to keep the underlying link from idling out.
    ///
    /// # Errors
    /// Propagates connection and query failures.
    pub fn keep_alive(&mut self) -> Result<(), DalError> {
        executor::run_select(&mut self.manager, &self.registry, "SELECT 1", &[])?;
        Ok(())
    }

    /// Quote a string as a SQL literal (single quotes, doubled embedded
    /// quotes). Prefer bound parameters; this exists for the rare statement
    /// that cannot take them.
    #[must_use]
    pub fn quote_literal(&self, raw: &str) -> String {
        format!("'{}'", raw.replace('\'', "''"))
    }

    // ------------------------------------------------------------------
    // Prepared statements
    // ------------------------------------------------------------------

    /// Prepare a statement for repeated execution. No I/O happens here; the
    /// returned id stays valid until [`Dal::dispose_statement`] or the
    /// instance is dropped.
    pub fn prepare(&mut self, sql: impl Into<String>, kind: StatementKind) -> StatementId {
        let sql = sql.into();
        let id = self.statements.prepare(sql, kind);
        debug!(statement_id = id, "statement prepared");
        id
    }

    /// Bind `params` and execute the statement. The cache lookup happens
    /// here — not at fetch time — and any hit is snapshotted into the
    /// handle, so an entry expiring between execute and fetch cannot turn
    /// into a surprise database query.
    ///
    /// # Errors
    /// Returns [`DalError::NoSuchStatement`] for an unknown id.
    pub fn bind_and_execute(
        &mut self,
        id: StatementId,
        params: Vec<BoundParam>,
    ) -> Result<(), DalError> {
        let sql = self.statements.get(id)?.sql().to_string();
        let key = keys::statement_key(&sql, &params);
        let snapshot = if self.cache.is_enabled() {
            self.cache.get_object::<ResultEnvelope>(&key)
        } else {
            None
        };
        let from_cache = snapshot.is_some();
        let handle = self.statements.get_mut(id)?;
        handle.record_binding(params, key);
        handle.record_execution(snapshot);
        debug!(statement_id = id, from_cache, "statement executed");
        Ok(())
    }

    /// Deliver the result of an executed statement.
    ///
    /// If a cache snapshot was captured at execute time it is returned
    /// tagged `Hit` without touching the connection. Otherwise the
    /// statement runs against the live database and — for `Select`
    /// statements, when `want_cache` is set — the fresh result is written
    /// to the cache under the statement's key with `ttl_seconds`.
    ///
    /// The handle transitions to `Fetched` and can be executed again with a
    /// fresh [`Dal::bind_and_execute`].
    ///
    /// # Errors
    /// Returns [`DalError::NoSuchStatement`] for an unknown id or a handle
    /// that was never executed, [`DalError::UncacheableStatementType`] when
    /// caching is requested for a non-`Select` statement, and propagates
    /// bind/query failures from the live path.
    pub fn fetch(
        &mut self,
        id: StatementId,
        want_cache: bool,
        ttl_seconds: u32,
    ) -> Result<ResultEnvelope, DalError> {
        let started = Instant::now();
        {
            let handle = self.statements.get(id)?;
            if handle.state() != StatementState::Executed {
                return Err(DalError::NoSuchStatement(format!(
                    "statement id {id} is {:?}; bind_and_execute must run before fetch",
                    handle.state()
                )));
            }
            if want_cache && !handle.kind().is_select() {
                return Err(DalError::UncacheableStatementType(handle.kind()));
            }
        }

        if let Some(envelope) = self.statements.get_mut(id)?.take_snapshot() {
            self.statements.get_mut(id)?.mark_fetched();
            debug!(
                statement_id = id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "fetched from execute-time cache snapshot"
            );
            return Ok(envelope.with_cache_state(CacheState::Hit));
        }

        let (sql, kind, bound, key) = {
            let handle = self.statements.get(id)?;
            (
                handle.sql().to_string(),
                handle.kind(),
                handle.bound_params().to_vec(),
                handle.cache_key().map(str::to_string),
            )
        };

        let envelope = if kind.is_select() {
            executor::run_select(&mut self.manager, &self.registry, &sql, &bound)?
        } else {
            executor::run_mutation(&mut self.manager, &self.registry, &sql, &bound, kind)?
        };
        let state = if self.cache.is_enabled() {
            CacheState::Miss
        } else {
            CacheState::Disabled
        };
        let envelope = envelope.with_cache_state(state);

        if want_cache && kind.is_select() {
            if let Some(key) = key {
                self.cache.put_object(&key, &envelope, ttl_seconds);
            }
        }
        self.statements.get_mut(id)?.mark_fetched();
        debug!(
            statement_id = id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fetched from database"
        );
        Ok(envelope)
    }

    /// Destroy a prepared-statement handle. Long-lived instances should
    /// dispose handles they no longer need; ids are never reused.
    ///
    /// # Errors
    /// Returns [`DalError::NoSuchStatement`] for an unknown id.
    pub fn dispose_statement(&mut self, id: StatementId) -> Result<(), DalError> {
        self.statements.dispose(id)
    }

    /// Number of live prepared-statement handles.
    #[must_use]
    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }

    /// The cache key of a prepared statement under its current binding,
    /// for external cache orchestration (e.g. targeted invalidation).
    ///
    /// # Errors
    /// Returns [`DalError::NoSuchStatement`] for an unknown id.
    pub fn statement_cache_key(&self, id: StatementId) -> Result<String, DalError> {
        let handle = self.statements.get(id)?;
        Ok(handle
            .cache_key()
            .map_or_else(|| keys::statement_key(handle.sql(), handle.bound_params()), str::to_string))
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Open a transaction. Until [`Dal::commit`] or [`Dal::rollback`], the
    /// connection survives between operations instead of being released
    /// after each one.
    ///
    /// # Errors
    /// Fails if a transaction is already open or the database rejects
    /// `BEGIN`.
    pub fn start_transaction(&mut self) -> Result<(), DalError> {
        self.manager.begin_transaction(&self.registry)
    }

    /// Commit the open transaction and release the connection.
    ///
    /// # Errors
    /// Fails if no transaction is open or the database rejects `COMMIT`.
    pub fn commit(&mut self) -> Result<(), DalError> {
        self.manager.commit()
    }

    /// Roll back the open transaction and release the connection.
    ///
    /// # Errors
    /// Fails if no transaction is open or the database rejects `ROLLBACK`.
    pub fn rollback(&mut self) -> Result<(), DalError> {
        self.manager.rollback()
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.manager.in_transaction()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    // ------------------------------------------------------------------
    // Generic object cache
    // ------------------------------------------------------------------

    /// Cache an arbitrary serializable object under `id` for `ttl_seconds`.
    /// Returns whether the object was stored (always `false` when the cache
    /// subsystem is disabled).
    pub fn cache_object<T: Serialize>(&mut self, id: &str, value: &T, ttl_seconds: u32) -> bool {
        self.cache.put_object(id, value, ttl_seconds)
    }

    /// Fetch a previously cached object, or `None` when absent, expired, or
    /// the subsystem is disabled.
    pub fn get_cached_object<T: DeserializeOwned>(&mut self, id: &str) -> Option<T> {
        self.cache.get_object(id)
    }

    /// Remove a cached object. Returns whether anything was removed.
    pub fn uncache_object(&mut self, id: &str) -> bool {
        self.cache.delete(id)
    }

    // ------------------------------------------------------------------
    // Pluggable backends
    // ------------------------------------------------------------------

    /// Register a pluggable store under `name`. Typically done once at
    /// startup, right after [`Dal::new`].
    pub fn register_backend(&mut self, name: impl Into<String>, backend: Box<dyn Backend>) {
        self.backends.register(name, backend);
    }

    /// Direct access to a registered backend for `save`/`delete`/`connect`.
    ///
    /// # Errors
    /// Returns [`DalError::UnknownDatabase`] when nothing is registered
    /// under `name`.
    pub fn backend(&mut self, name: &str) -> Result<&mut dyn Backend, DalError> {
        self.backends.get_mut(name)
    }

    /// Run a backend read through the same cache-aside path as SQL reads:
    /// key derived from the backend name and the query spec, hit
    /// short-circuits the backend, miss populates the cache best-effort.
    ///
    /// # Errors
    /// Returns [`DalError::UnknownDatabase`] for an unregistered backend
    /// and propagates the backend's own failures.
    pub fn backend_get_with_cache(
        &mut self,
        name: &str,
        spec: &QuerySpec,
        ttl_seconds: u32,
    ) -> Result<BackendRead, DalError> {
        if !self.cache.is_enabled() {
            let payload = self.backends.get_mut(name)?.get(spec)?;
            return Ok(BackendRead {
                payload,
                cache_state: CacheState::Disabled,
            });
        }
        let key = keys::backend_key(name, &serde_json::to_value(spec)?);
        if let Some(payload) = self.cache.get_object::<serde_json::Value>(&key) {
            debug!(backend = name, "backend read served from cache");
            return Ok(BackendRead {
                payload,
                cache_state: CacheState::Hit,
            });
        }
        let payload = self.backends.get_mut(name)?.get(spec)?;
        self.cache.put_object(&key, &payload, ttl_seconds);
        Ok(BackendRead {
            payload,
            cache_state: CacheState::Miss,
        })
    }
}
