use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DalError;
use crate::types::DatabaseType;

fn default_writable() -> bool {
    true
}

/// Connection parameters registered under one database alias.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Which driver to open the connection with
    pub database_type: DatabaseType,
    /// Driver address: a file path (or `:memory:`) for `SQLite`, a
    /// connection string or URL for `PostgreSQL`
    pub address: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Driver hint: keep the underlying link alive across units of work
    /// where the driver supports it. `SQLite` ignores this.
    #[serde(default)]
    pub persistent: bool,
    /// Whether mutations are allowed against this alias
    #[serde(default = "default_writable")]
    pub writable: bool,
}

impl ConnectionParams {
    /// Parameters for a writable `SQLite` database at `path`.
    #[cfg(feature = "sqlite")]
    #[must_use]
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            database_type: DatabaseType::Sqlite,
            address: path.into(),
            user: None,
            password: None,
            persistent: false,
            writable: true,
        }
    }

    /// Parameters for a writable `PostgreSQL` database reachable via
    /// `conn_str` (URL or keyword/value form).
    #[cfg(feature = "postgres")]
    #[must_use]
    pub fn postgres(conn_str: impl Into<String>) -> Self {
        Self {
            database_type: DatabaseType::Postgres,
            address: conn_str.into(),
            user: None,
            password: None,
            persistent: false,
            writable: true,
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_writable(mut self, writable: bool) -> Self {
        self.writable = writable;
        self
    }

    #[must_use]
    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }
}

/// Immutable mapping from alias name to connection parameters.
///
/// Built once at configuration time; an alias referenced by any operation
/// must exist here or the operation fails with [`DalError::UnknownDatabase`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasRegistry {
    aliases: HashMap<String, ConnectionParams>,
}

impl AliasRegistry {
    #[must_use]
    pub fn new(aliases: HashMap<String, ConnectionParams>) -> Self {
        Self { aliases }
    }

    /// Look up an alias.
    ///
    /// # Errors
    /// Returns [`DalError::UnknownDatabase`] if the alias was never
    /// registered.
    pub fn get(&self, alias: &str) -> Result<&ConnectionParams, DalError> {
        self.aliases
            .get(alias)
            .ok_or_else(|| DalError::UnknownDatabase(alias.to_string()))
    }

    #[must_use]
    pub fn contains(&self, alias: &str) -> bool {
        self.aliases.contains_key(alias)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Which cache provider backs the [`crate::cache::CacheStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    /// A memcached deployment; endpoints as `host:port` or full
    /// `memcache://` URLs
    Memcached { endpoints: Vec<String> },
    /// An in-process TTL map; suitable for embedded deployments and tests
    InProcess,
}

/// Cache subsystem settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// When false, every cache operation is a no-op and results are tagged
    /// `CacheState::Disabled`
    pub enabled: bool,
    pub backend: CacheBackend,
}

impl CacheSettings {
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            backend: CacheBackend::InProcess,
        }
    }

    #[must_use]
    pub fn memcached(endpoints: Vec<String>) -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::Memcached { endpoints },
        }
    }

    #[must_use]
    pub fn in_process() -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::InProcess,
        }
    }
}

/// Complete configuration for one DAL instance.
///
/// Constructed once at process start and handed to [`crate::Dal::new`];
/// there is no ambient global configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DalConfig {
    pub aliases: AliasRegistry,
    pub cache: CacheSettings,
}

impl DalConfig {
    #[must_use]
    pub fn builder() -> DalConfigBuilder {
        DalConfigBuilder::new()
    }

    /// Load a configuration from a JSON document.
    ///
    /// # Errors
    /// Returns [`DalError::ConfigError`] if the document does not parse.
    pub fn from_json_str(json: &str) -> Result<Self, DalError> {
        serde_json::from_str(json)
            .map_err(|e| DalError::ConfigError(format!("invalid config document: {e}")))
    }

    /// Load a configuration from a JSON file on disk.
    ///
    /// # Errors
    /// Returns [`DalError::ConfigError`] if the file cannot be read or does
    /// not parse.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DalError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            DalError::ConfigError(format!(
                "cannot read config file {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_json_str(&text)
    }
}

/// Fluent builder for [`DalConfig`].
#[derive(Debug, Default)]
pub struct DalConfigBuilder {
    aliases: HashMap<String, ConnectionParams>,
    cache: Option<CacheSettings>,
}

impl DalConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register connection parameters under `alias`.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>, params: ConnectionParams) -> Self {
        self.aliases.insert(alias.into(), params);
        self
    }

    #[must_use]
    pub fn cache(mut self, settings: CacheSettings) -> Self {
        self.cache = Some(settings);
        self
    }

    /// Finish the configuration. Caching defaults to disabled when no cache
    /// settings were supplied.
    #[must_use]
    pub fn build(self) -> DalConfig {
        DalConfig {
            aliases: AliasRegistry::new(self.aliases),
            cache: self.cache.unwrap_or_else(CacheSettings::disabled),
        }
    }
}
