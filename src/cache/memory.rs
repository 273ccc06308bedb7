use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::provider::{CacheProvider, ProviderError};

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn new(value: &[u8], ttl_seconds: u32) -> Self {
        let expires_at = if ttl_seconds == 0 {
            None
        } else {
            Some(Instant::now() + Duration::from_secs(u64::from(ttl_seconds)))
        };
        Self {
            value: value.to_vec(),
            expires_at,
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-process cache provider with memcached-compatible add/replace
/// preconditions and per-entry TTLs.
///
/// Serves embedded deployments that want read-through caching without a
/// cache server, and the test suite.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    entries: HashMap<String, MemoryEntry>,
}

impl MemoryProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // Expired entries count as absent everywhere; drop them on contact.
    fn evict_if_expired(&mut self, key: &str) {
        if self.entries.get(key).is_some_and(MemoryEntry::is_expired) {
            self.entries.remove(key);
        }
    }
}

impl CacheProvider for MemoryProvider {
    fn add(&mut self, key: &str, value: &[u8], ttl_seconds: u32) -> Result<bool, ProviderError> {
        self.evict_if_expired(key);
        if self.entries.contains_key(key) {
            return Ok(false);
        }
        self.entries
            .insert(key.to_string(), MemoryEntry::new(value, ttl_seconds));
        Ok(true)
    }

    fn replace(
        &mut self,
        key: &str,
        value: &[u8],
        ttl_seconds: u32,
    ) -> Result<bool, ProviderError> {
        self.evict_if_expired(key);
        if !self.entries.contains_key(key) {
            return Ok(false);
        }
        self.entries
            .insert(key.to_string(), MemoryEntry::new(value, ttl_seconds));
        Ok(true)
    }

    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>, ProviderError> {
        self.evict_if_expired(key);
        Ok(self.entries.get(key).map(|entry| entry.value.clone()))
    }

    fn delete(&mut self, key: &str) -> Result<bool, ProviderError> {
        self.evict_if_expired(key);
        Ok(self.entries.remove(key).is_some())
    }
}
