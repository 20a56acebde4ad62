//! Cached Lookup
//!
//! Memoizes a deferred-producing fetch in an injected `ExpiringCache`.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::ExpiringCache;
use crate::deferred::Deferred;

/// Serves lookups from a shared cache and falls back to `fetch` on a miss.
///
/// The fulfilled value of a fetch is stored under the looked-up key with
/// the configured TTL. Rejections are not cached.
pub struct CachedLookup<V, E> {
    cache: Arc<ExpiringCache<V>>,
    fetch: Box<dyn Fn(&str) -> Deferred<V, E>>,
    ttl: Option<u64>,
}

impl<V, E> CachedLookup<V, E>
where
    V: Clone + Send + 'static,
    E: Clone + 'static,
{
    pub fn new<F>(cache: Arc<ExpiringCache<V>>, fetch: F) -> Self
    where
        F: Fn(&str) -> Deferred<V, E> + 'static,
    {
        Self {
            cache,
            fetch: Box::new(fetch),
            ttl: None,
        }
    }

    /// TTL in seconds for fetched values (default: the cache's default TTL).
    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Returns a fulfilled deferred on a cache hit, otherwise the deferred
    /// produced by `fetch`.
    pub fn get(&self, key: &str) -> Deferred<V, E> {
        if let Some(value) = self.cache.get(key) {
            return Deferred::resolved(value);
        }

        let cache = self.cache.clone();
        let ttl = self.ttl;
        let owned_key = key.to_string();
        (self.fetch)(key).and_then(move |value| {
            match cache.set(owned_key.as_str(), value.clone(), ttl) {
                Ok(true) => debug!(key = %owned_key, "Cached fetched value"),
                Ok(false) => debug!(key = %owned_key, "Cache at key limit; fetched value not cached"),
                Err(e) => warn!(key = %owned_key, error = %e, "Fetched value not cached"),
            }
            value
        })
    }

    /// Drops the cached value for `key` so the next lookup fetches again.
    pub fn invalidate(&self, key: &str) -> usize {
        self.cache.delete(key)
    }

    pub fn cache(&self) -> &Arc<ExpiringCache<V>> {
        &self.cache
    }
}
