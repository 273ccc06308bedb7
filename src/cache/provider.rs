use thiserror::Error;

/// A cache-provider failure.
///
/// Never escapes [`crate::cache::CacheStore`]: the store degrades to a miss
/// (or skips the write) and reports the failure through `tracing`.
#[derive(Debug, Error)]
#[error("cache provider error: {0}")]
pub struct ProviderError(pub String);

/// The primitive operations the cache store is built on.
///
/// `add` and `replace` mirror memcached's semantics: each one fails its
/// precondition unconditionally (`add` on an existing key, `replace` on an
/// absent one) rather than falling through to the other behavior. The store
/// composes them into upsert-style `put`.
///
/// A `ttl_seconds` of 0 means the entry never expires.
pub trait CacheProvider: Send + std::fmt::Debug {
    /// Insert `value` under `key` only if the key is absent. Returns `false`
    /// when the key already exists.
    fn add(&mut self, key: &str, value: &[u8], ttl_seconds: u32) -> Result<bool, ProviderError>;

    /// Overwrite the value under `key` only if the key is present. Returns
    /// `false` when the key is absent.
    fn replace(&mut self, key: &str, value: &[u8], ttl_seconds: u32)
    -> Result<bool, ProviderError>;

    /// Fetch the value under `key`, or `None` when absent or expired.
    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>, ProviderError>;

    /// Remove the entry under `key`. Returns whether anything was removed.
    fn delete(&mut self, key: &str) -> Result<bool, ProviderError>;
}
