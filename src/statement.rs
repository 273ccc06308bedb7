//! Prepared-statement handles and their registry.
//!
//! A handle moves `Prepared → Bound → Executed → Fetched` and may re-enter
//! `Bound` with a fresh [`crate::Dal::bind_and_execute`]. The cache lookup
//! happens at execute time, not fetch time: the hit (if any) is snapshotted
//! into the handle so an entry expiring between execute and fetch cannot
//! turn a promised hit into a surprise database query.

use std::collections::HashMap;

use crate::error::DalError;
use crate::results::ResultEnvelope;
use crate::types::{BoundParam, StatementKind};

/// Opaque id of a prepared statement, unique for the lifetime of the owning
/// DAL instance (monotonically assigned, never reused).
pub type StatementId = u64;

/// Lifecycle state of a prepared-statement handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    /// Created by `prepare`; no parameters bound yet
    Prepared,
    /// Parameters recorded, cache not yet consulted
    Bound,
    /// Cache consulted (and any hit snapshotted); ready to fetch
    Executed,
    /// Result delivered; may be re-executed with fresh parameters
    Fetched,
}

/// One prepared statement, exclusively owned by the registry.
#[derive(Debug)]
pub struct StatementHandle {
    id: StatementId,
    sql: String,
    kind: StatementKind,
    state: StatementState,
    bound: Vec<BoundParam>,
    cache_key: Option<String>,
    snapshot: Option<ResultEnvelope>,
}

impl StatementHandle {
    fn new(id: StatementId, sql: String, kind: StatementKind) -> Self {
        Self {
            id,
            sql,
            kind,
            state: StatementState::Prepared,
            bound: Vec::new(),
            cache_key: None,
            snapshot: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> StatementId {
        self.id
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    #[must_use]
    pub fn state(&self) -> StatementState {
        self.state
    }

    /// Most recent bound-parameter set.
    #[must_use]
    pub fn bound_params(&self) -> &[BoundParam] {
        &self.bound
    }

    /// Cache key of the most recent binding, if any.
    #[must_use]
    pub fn cache_key(&self) -> Option<&str> {
        self.cache_key.as_deref()
    }

    pub(crate) fn record_binding(&mut self, params: Vec<BoundParam>, cache_key: String) {
        self.bound = params;
        self.cache_key = Some(cache_key);
        self.snapshot = None;
        self.state = StatementState::Bound;
    }

    pub(crate) fn record_execution(&mut self, snapshot: Option<ResultEnvelope>) {
        self.snapshot = snapshot;
        self.state = StatementState::Executed;
    }

    pub(crate) fn take_snapshot(&mut self) -> Option<ResultEnvelope> {
        self.snapshot.take()
    }

    pub(crate) fn mark_fetched(&mut self) {
        self.state = StatementState::Fetched;
    }
}

/// Owner of every prepared statement of one DAL instance.
///
/// Handles are only destroyed through [`StatementRegistry::dispose`] or when
/// the instance itself is dropped; a long-lived instance should dispose
/// handles it no longer needs.
#[derive(Debug, Default)]
pub(crate) struct StatementRegistry {
    handles: HashMap<StatementId, StatementHandle>,
    next_id: StatementId,
}

impl StatementRegistry {
    pub(crate) fn prepare(&mut self, sql: String, kind: StatementKind) -> StatementId {
        let id = self.next_id;
        self.next_id += 1;
        self.handles.insert(id, StatementHandle::new(id, sql, kind));
        id
    }

    pub(crate) fn get(&self, id: StatementId) -> Result<&StatementHandle, DalError> {
        self.handles
            .get(&id)
            .ok_or_else(|| DalError::NoSuchStatement(format!("statement id {id} does not exist")))
    }

    pub(crate) fn get_mut(&mut self, id: StatementId) -> Result<&mut StatementHandle, DalError> {
        self.handles
            .get_mut(&id)
            .ok_or_else(|| DalError::NoSuchStatement(format!("statement id {id} does not exist")))
    }

    pub(crate) fn dispose(&mut self, id: StatementId) -> Result<(), DalError> {
        self.handles
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DalError::NoSuchStatement(format!("statement id {id} does not exist")))
    }

    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let mut registry = StatementRegistry::default();
        let first = registry.prepare("SELECT 1".into(), StatementKind::Select);
        let second = registry.prepare("SELECT 2".into(), StatementKind::Select);
        assert!(second > first);
        registry.dispose(first).expect("dispose");
        let third = registry.prepare("SELECT 3".into(), StatementKind::Select);
        assert!(third > second);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn unknown_ids_fail_typed() {
        let mut registry = StatementRegistry::default();
        assert!(matches!(
            registry.get(42),
            Err(DalError::NoSuchStatement(_))
        ));
        assert!(matches!(
            registry.dispose(42),
            Err(DalError::NoSuchStatement(_))
        ));
    }

    #[test]
    fn rebinding_clears_the_snapshot_and_reenters_bound() {
        let mut registry = StatementRegistry::default();
        let id = registry.prepare("SELECT :a".into(), StatementKind::Select);
        let handle = registry.get_mut(id).expect("handle");
        handle.record_binding(Vec::new(), "key1".into());
        handle.record_execution(None);
        handle.mark_fetched();
        assert_eq!(handle.state(), StatementState::Fetched);
        handle.record_binding(Vec::new(), "key2".into());
        assert_eq!(handle.state(), StatementState::Bound);
        assert!(handle.take_snapshot().is_none());
    }
}
