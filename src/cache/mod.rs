//! Read-through cache facade.
//!
//! [`CacheStore`] hides the provider behind a small surface: `get` returns a
//! typed [`CacheLookup`] instead of raising on the common miss case, `put`
//! composes the provider's add/replace primitives into an upsert, and every
//! provider failure degrades to a miss (or a skipped write) reported through
//! `tracing` — the cache is an optimization, never a correctness dependency.

mod memcached;
mod memory;
mod provider;

pub use memcached::MemcachedProvider;
pub use memory::MemoryProvider;
pub use provider::{CacheProvider, ProviderError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::{CacheBackend, CacheSettings};

/// Typed outcome of a cache read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// The stored bytes for the key
    Hit(Vec<u8>),
    /// No live entry for the key
    Miss,
}

/// Mapping-client facade over the configured cache provider.
///
/// The provider client is created lazily on first use and reused for the
/// life of the store. When the subsystem is administratively disabled every
/// operation is a no-op reporting "absent"/`false`; callers distinguish that
/// from an empty cache via [`CacheStore::is_enabled`].
#[derive(Debug)]
pub struct CacheStore {
    enabled: bool,
    backend: CacheBackend,
    provider: Option<Box<dyn CacheProvider>>,
}

impl CacheStore {
    #[must_use]
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            backend: settings.backend,
            provider: None,
        }
    }

    /// Build a store around a caller-supplied provider (used by tests and
    /// embedding applications with bespoke cache clients).
    #[must_use]
    pub fn with_provider(provider: Box<dyn CacheProvider>) -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::InProcess,
            provider: Some(provider),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn provider(&mut self) -> Option<&mut Box<dyn CacheProvider>> {
        if !self.enabled {
            return None;
        }
        if self.provider.is_none() {
            self.provider = Some(match &self.backend {
                CacheBackend::Memcached { endpoints } => {
                    Box::new(MemcachedProvider::new(endpoints.clone()))
                }
                CacheBackend::InProcess => Box::new(MemoryProvider::new()),
            });
        }
        self.provider.as_mut()
    }

    /// Look up `key`. Never fails: provider errors are logged and reported
    /// as [`CacheLookup::Miss`].
    pub fn get(&mut self, key: &str) -> CacheLookup {
        let Some(provider) = self.provider() else {
            return CacheLookup::Miss;
        };
        match provider.get(key) {
            Ok(Some(bytes)) => CacheLookup::Hit(bytes),
            Ok(None) => CacheLookup::Miss,
            Err(err) => {
                warn!(key, %err, "cache read failed, treating as miss");
                CacheLookup::Miss
            }
        }
    }

    /// Store `value` under `key` for `ttl_seconds`, overwriting any existing
    /// entry: try `add` first, fall back to `replace` when the key already
    /// exists. Returns whether the value was stored; failures are logged,
    /// never raised.
    pub fn put(&mut self, key: &str, value: &[u8], ttl_seconds: u32) -> bool {
        let Some(provider) = self.provider() else {
            return false;
        };
        let added = match provider.add(key, value, ttl_seconds) {
            Ok(added) => added,
            Err(err) => {
                warn!(key, %err, "cache add failed, skipping write");
                return false;
            }
        };
        if added {
            return true;
        }
        match provider.replace(key, value, ttl_seconds) {
            Ok(true) => true,
            Ok(false) => {
                // Entry vanished between add and replace; next put wins.
                debug!(key, "cache entry disappeared between add and replace");
                false
            }
            Err(err) => {
                warn!(key, %err, "cache replace failed, skipping write");
                false
            }
        }
    }

    /// Remove the entry under `key`. Returns whether anything was removed;
    /// `false` when disabled or on provider failure.
    pub fn delete(&mut self, key: &str) -> bool {
        let Some(provider) = self.provider() else {
            return false;
        };
        match provider.delete(key) {
            Ok(removed) => removed,
            Err(err) => {
                warn!(key, %err, "cache delete failed");
                false
            }
        }
    }

    /// Serialize `value` and store it under `key`.
    pub fn put_object<T: Serialize>(&mut self, key: &str, value: &T, ttl_seconds: u32) -> bool {
        if !self.enabled {
            return false;
        }
        match serde_json::to_vec(value) {
            Ok(bytes) => self.put(key, &bytes, ttl_seconds),
            Err(err) => {
                warn!(key, %err, "cannot serialize value for cache, skipping write");
                false
            }
        }
    }

    /// Fetch and deserialize the object under `key`. An entry that no longer
    /// deserializes is treated as a miss.
    pub fn get_object<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        match self.get(key) {
            CacheLookup::Hit(bytes) => match serde_json::from_slice(&bytes) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(key, %err, "cached bytes do not deserialize, treating as miss");
                    None
                }
            },
            CacheLookup::Miss => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_store_reports_absent_for_everything() {
        let mut store = CacheStore::new(CacheSettings::disabled());
        assert!(!store.is_enabled());
        assert!(!store.put("k", b"v", 60));
        assert_eq!(store.get("k"), CacheLookup::Miss);
        assert!(!store.delete("k"));
    }

    #[test]
    fn put_overwrites_existing_entries() {
        let mut store = CacheStore::new(CacheSettings::in_process());
        assert!(store.put("k", b"v1", 0));
        assert!(store.put("k", b"v2", 0));
        assert_eq!(store.get("k"), CacheLookup::Hit(b"v2".to_vec()));
        assert!(store.delete("k"));
        assert_eq!(store.get("k"), CacheLookup::Miss);
    }
}
