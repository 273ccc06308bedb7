//! Pluggable non-relational stores.
//!
//! Document and graph backends participate through a fixed capability set —
//! connect/save/delete/get — registered under a name at startup. The DAL
//! core treats any such backend uniformly: `get` payloads are JSON and
//! therefore cacheable through the same cache-aside path as SQL results;
//! `save`/`delete` pass through and may direct invalidation via
//! [`crate::Dal::uncache_object`]. Concrete clients (Mongo-style document
//! stores, REST graph stores) live outside this crate.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::DalError;
use crate::types::CacheState;

/// Connection data for a pluggable backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendParams {
    /// Host, URL, or other backend-specific address
    pub address: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Backend-specific extras (replica set names, protocol options, …)
    #[serde(default)]
    pub options: JsonValue,
}

impl BackendParams {
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            database: None,
            username: None,
            password: None,
            options: JsonValue::Null,
        }
    }
}

/// What to write, and where.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveSpec {
    /// Collection, index, or path the write lands in
    pub target: String,
    /// The document or properties to persist
    pub document: JsonValue,
    /// Whether this is a fresh insert or an update of existing data
    pub operation: SaveOperation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveOperation {
    Insert,
    Update,
}

/// What to delete, and where.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteSpec {
    pub target: String,
    /// Backend-specific match criteria
    pub criteria: JsonValue,
}

/// What to read, and where.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuerySpec {
    pub target: String,
    /// Backend-specific query document
    pub query: JsonValue,
}

/// Outcome of a backend save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveOutcome {
    /// Identifier assigned by the backend, when it reports one
    pub id: Option<String>,
    pub acknowledged: bool,
}

/// Outcome of a backend delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub removed: u64,
}

/// A backend read plus where it came from, relative to the cache.
#[derive(Debug, Clone)]
pub struct BackendRead {
    pub payload: JsonValue,
    pub cache_state: CacheState,
}

/// The uniform capability a pluggable store exposes.
pub trait Backend: Send {
    /// Establish the link described by `params`.
    ///
    /// # Errors
    /// Returns [`DalError::ConnectionError`] when the backend is
    /// unreachable or the parameters are unusable.
    fn connect(&mut self, params: &BackendParams) -> Result<(), DalError>;

    fn is_connected(&self) -> bool;

    /// Persist a document.
    ///
    /// # Errors
    /// Propagates the backend's failure as a typed error.
    fn save(&mut self, spec: &SaveSpec) -> Result<SaveOutcome, DalError>;

    /// Remove matching data.
    ///
    /// # Errors
    /// Propagates the backend's failure as a typed error.
    fn delete(&mut self, spec: &DeleteSpec) -> Result<DeleteOutcome, DalError>;

    /// Read matching data. Payloads are JSON so results can flow through
    /// the cache unchanged.
    ///
    /// # Errors
    /// Propagates the backend's failure as a typed error.
    fn get(&mut self, spec: &QuerySpec) -> Result<JsonValue, DalError>;
}

/// Name → implementation mapping, populated once at startup.
#[derive(Default)]
pub struct BackendRegistry {
    backends: HashMap<String, Box<dyn Backend>>,
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("names", &self.backends.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl BackendRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `backend` under `name`, replacing any previous registration.
    pub fn register(&mut self, name: impl Into<String>, backend: Box<dyn Backend>) {
        self.backends.insert(name.into(), backend);
    }

    /// Look up a registered backend.
    ///
    /// # Errors
    /// Returns [`DalError::UnknownDatabase`] when nothing is registered
    /// under `name`.
    pub fn get_mut(&mut self, name: &str) -> Result<&mut dyn Backend, DalError> {
        match self.backends.get_mut(name) {
            Some(backend) => Ok(backend.as_mut()),
            None => Err(DalError::UnknownDatabase(name.to_string())),
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.backends.contains_key(name)
    }
}
