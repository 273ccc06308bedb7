use memcache::{Client, CommandError, MemcacheError};

use super::provider::{CacheProvider, ProviderError};

fn endpoint_url(endpoint: &str) -> String {
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("memcache://{endpoint}")
    }
}

fn provider_error(err: &MemcacheError) -> ProviderError {
    ProviderError(err.to_string())
}

/// Cache provider backed by one or more memcached servers.
///
/// The client is opened lazily on first use and then reused for the life of
/// the provider; entries are opaque byte blobs to the servers.
pub struct MemcachedProvider {
    endpoints: Vec<String>,
    client: Option<Client>,
}

impl std::fmt::Debug for MemcachedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemcachedProvider")
            .field("endpoints", &self.endpoints)
            .field("connected", &self.client.is_some())
            .finish()
    }
}

impl MemcachedProvider {
    #[must_use]
    pub fn new(endpoints: Vec<String>) -> Self {
        Self {
            endpoints,
            client: None,
        }
    }

    fn client(&mut self) -> Result<&Client, ProviderError> {
        if self.client.is_none() {
            let urls: Vec<String> = self.endpoints.iter().map(|e| endpoint_url(e)).collect();
            if urls.is_empty() {
                return Err(ProviderError("no memcached endpoints configured".into()));
            }
            let client = Client::connect(urls)
                .map_err(|e| ProviderError(format!("cannot reach memcached: {e}")))?;
            self.client = Some(client);
        }
        self.client
            .as_ref()
            .ok_or_else(|| ProviderError("memcached client unavailable".into()))
    }
}

impl CacheProvider for MemcachedProvider {
    fn add(&mut self, key: &str, value: &[u8], ttl_seconds: u32) -> Result<bool, ProviderError> {
        match self.client()?.add(key, value, ttl_seconds) {
            Ok(()) => Ok(true),
            Err(MemcacheError::CommandError(CommandError::KeyExists)) => Ok(false),
            Err(err) => Err(provider_error(&err)),
        }
    }

    fn replace(
        &mut self,
        key: &str,
        value: &[u8],
        ttl_seconds: u32,
    ) -> Result<bool, ProviderError> {
        match self.client()?.replace(key, value, ttl_seconds) {
            Ok(()) => Ok(true),
            Err(MemcacheError::CommandError(CommandError::KeyNotFound)) => Ok(false),
            Err(err) => Err(provider_error(&err)),
        }
    }

    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>, ProviderError> {
        self.client()?
            .get::<Vec<u8>>(key)
            .map_err(|e| provider_error(&e))
    }

    fn delete(&mut self, key: &str) -> Result<bool, ProviderError> {
        self.client()?.delete(key).map_err(|e| provider_error(&e))
    }
}
