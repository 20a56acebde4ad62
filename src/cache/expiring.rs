//! Expiring Cache
//!
//! Shared handle over a `CacheStore` whose sweep runs on an interval
//! scheduler and is owned by the cache's own `Janitor`.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::cache::{CacheStats, CacheStore, TtlRemaining};
use crate::config::CacheOptions;
use crate::error::Result;
use crate::janitor::{Janitor, Task};
use crate::runtime::{Clock, IntervalScheduler, SystemClock};

/// One element of a `set_multiple` batch.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheItem<V> {
    pub key: String,
    pub value: V,
    /// TTL in seconds, None = cache default, 0 = never expires
    pub ttl: Option<u64>,
}

impl<V> CacheItem<V> {
    pub fn new(key: impl Into<String>, value: V) -> Self {
        Self {
            key: key.into(),
            value,
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

// == Expiring Cache ==
/// String-keyed cache with per-entry TTL, a key limit and periodic sweeping.
///
/// Reads through `get`/`take` treat expired entries as absent. `keys`, `has`
/// and `get_ttl` look at physical presence only, so they report expired
/// entries until the next sweep removes them.
///
/// Dropping the cache cancels its sweep; `destroy` also clears the entries.
pub struct ExpiringCache<V> {
    store: Arc<Mutex<CacheStore<V>>>,
    clock: Arc<dyn Clock>,
    janitor: Janitor,
    options: CacheOptions,
}

impl<V> ExpiringCache<V>
where
    V: Clone + Send + 'static,
{
    // == Constructor ==
    /// Creates a cache on the system clock and schedules its sweep every
    /// `options.check_interval` seconds.
    pub fn new(options: CacheOptions, scheduler: &dyn IntervalScheduler) -> Result<Self> {
        Self::with_clock(options, scheduler, Arc::new(SystemClock))
    }

    /// Creates a cache reading time from `clock`.
    pub fn with_clock(
        options: CacheOptions,
        scheduler: &dyn IntervalScheduler,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        options.validate()?;

        let store = Arc::new(Mutex::new(CacheStore::new(&options)));
        let sweep_store = Arc::downgrade(&store);
        let sweep_clock = clock.clone();

        let sweep_task = scheduler.schedule(
            Duration::from_secs(options.check_interval),
            Box::new(move || {
                let Some(store) = sweep_store.upgrade() else {
                    return;
                };
                let removed = store.lock().sweep(sweep_clock.now_ms());
                if removed > 0 {
                    info!("TTL sweep: removed {} expired entries", removed);
                } else {
                    debug!("TTL sweep: no expired entries found");
                }
            }),
        );

        let mut janitor = Janitor::new();
        janitor.add_task(Task::from_connection(sweep_task));

        debug!(
            default_ttl = options.default_ttl,
            check_interval = options.check_interval,
            max_keys = options.max_keys,
            "Expiring cache created"
        );

        Ok(Self {
            store,
            clock,
            janitor,
            options,
        })
    }

    // == Set ==
    /// Stores `value` under `key`.
    ///
    /// Returns `Ok(false)` when the key is new and the key limit is reached.
    /// `ttl` is in seconds; None uses the default TTL and 0 never expires.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<u64>) -> Result<bool> {
        let now = self.clock.now_ms();
        self.store.lock().set(key.into(), value, ttl, now)
    }

    /// Applies `set` to each item in order, stopping at the first refusal.
    ///
    /// Items stored before the refusal stay stored.
    pub fn set_multiple(&self, items: Vec<CacheItem<V>>) -> Result<bool> {
        let now = self.clock.now_ms();
        let mut store = self.store.lock();
        for item in items {
            if !store.set(item.key, item.value, item.ttl, now)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    // == Get ==
    /// Returns the value if present and not expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();
        self.store.lock().get(key, now)
    }

    /// Looks up each key independently. Every requested key appears in the
    /// result, mapped to None when absent or expired.
    pub fn get_multiple<S: AsRef<str>>(&self, keys: &[S]) -> HashMap<String, Option<V>> {
        let now = self.clock.now_ms();
        let mut store = self.store.lock();
        keys.iter()
            .map(|key| {
                let key = key.as_ref();
                (key.to_string(), store.get(key, now))
            })
            .collect()
    }

    /// Returns the value like `get` and removes the entry on a hit.
    pub fn take(&self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();
        self.store.lock().take(key, now)
    }

    // == Delete ==
    /// Removes `key`. Returns 1 if it was present, else 0.
    pub fn delete(&self, key: &str) -> usize {
        self.store.lock().delete(key)
    }

    /// Removes every key in `keys` and returns how many were present.
    pub fn multiple_delete<S: AsRef<str>>(&self, keys: &[S]) -> usize {
        let mut store = self.store.lock();
        keys.iter().map(|key| store.delete(key.as_ref())).sum()
    }

    // == TTL ==
    /// Sets an existing entry to expire `seconds` from now (0 = never).
    ///
    /// Returns false if the key is absent.
    pub fn ttl(&self, key: &str, seconds: u64) -> Result<bool> {
        let now = self.clock.now_ms();
        self.store.lock().expire(key, seconds, now)
    }

    /// Remaining lifetime of `key`, or None if it is not present.
    ///
    /// No expiry check is applied first: an expired entry that has not been
    /// swept reports `Seconds(n)` with `n <= 0`.
    pub fn get_ttl(&self, key: &str) -> Option<TtlRemaining> {
        let now = self.clock.now_ms();
        self.store.lock().ttl_remaining(key, now)
    }

    // == Presence ==
    /// Every physically present key, including expired ones not yet swept.
    pub fn keys(&self) -> HashSet<String> {
        self.store.lock().keys()
    }

    /// Whether `key` is physically present, ignoring expiry.
    pub fn has(&self, key: &str) -> bool {
        self.store.lock().has(key)
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }

    // == Sweep ==
    /// Runs the sweep immediately. Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_ms();
        self.store.lock().sweep(now)
    }

    pub fn stats(&self) -> CacheStats {
        self.store.lock().stats()
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    // == Destroy ==
    /// Clears every entry and cancels the background sweep.
    pub fn destroy(mut self) {
        let cleared = {
            let mut store = self.store.lock();
            let count = store.len();
            store.clear();
            count
        };
        self.janitor.clean();
        debug!(cleared, "Expiring cache destroyed");
    }
}

impl<V> Drop for ExpiringCache<V> {
    fn drop(&mut self) {
        self.janitor.clean();
    }
}

impl<V: Clone> fmt::Debug for ExpiringCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringCache")
            .field("entries", &self.store.lock().len())
            .field("options", &self.options)
            .field("janitor", &self.janitor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use crate::runtime::{ManualScheduler, MockClock, TokioScheduler};

    fn options(max_keys: usize) -> CacheOptions {
        CacheOptions {
            default_ttl: 60,
            check_interval: 10,
            max_keys,
        }
    }

    fn test_cache(max_keys: usize) -> (ExpiringCache<String>, ManualScheduler, MockClock) {
        let scheduler = ManualScheduler::new();
        let clock = MockClock::at(1_000_000);
        let cache =
            ExpiringCache::with_clock(options(max_keys), &scheduler, Arc::new(clock.clone()))
                .unwrap();
        (cache, scheduler, clock)
    }

    #[test]
    fn test_construction_schedules_sweep() {
        let (cache, scheduler, _) = test_cache(0);
        assert_eq!(scheduler.periods(), vec![Duration::from_secs(10)]);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_rejects_zero_check_interval() {
        let scheduler = ManualScheduler::new();
        let options = CacheOptions {
            check_interval: 0,
            ..CacheOptions::default()
        };
        let result = ExpiringCache::<String>::new(options, &scheduler);
        assert!(matches!(result, Err(CacheError::InvalidOptions(_))));
        assert_eq!(scheduler.active_count(), 0);
    }

    #[test]
    fn test_set_get_and_expire() {
        let (cache, _, clock) = test_cache(0);

        assert!(cache.set("k", "v".to_string(), Some(5)).unwrap());
        assert_eq!(cache.get("k"), Some("v".to_string()));

        clock.advance(Duration::from_secs(6));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_scheduled_sweep_removes_expired_entries() {
        let (cache, scheduler, clock) = test_cache(0);

        cache.set("short", "a".to_string(), Some(5)).unwrap();
        cache.set("long", "b".to_string(), Some(500)).unwrap();

        clock.advance(Duration::from_secs(10));
        assert_eq!(cache.len(), 2, "Nothing is reclaimed before the sweep runs");

        scheduler.tick();
        assert_eq!(cache.keys(), HashSet::from(["long".to_string()]));
        assert_eq!(cache.stats().swept, 1);
    }

    #[test]
    fn test_set_multiple_stops_at_first_refusal() {
        let (cache, _, _) = test_cache(2);

        let stored = cache
            .set_multiple(vec![
                CacheItem::new("a", "1".to_string()),
                CacheItem::new("b", "2".to_string()).with_ttl(0),
                CacheItem::new("c", "3".to_string()),
                CacheItem::new("a", "4".to_string()),
            ])
            .unwrap();

        assert!(!stored);
        assert_eq!(cache.get("a"), Some("1".to_string()), "No rollback, no later items");
        assert_eq!(cache.get_ttl("b"), Some(TtlRemaining::Never));
        assert!(!cache.has("c"));
    }

    #[test]
    fn test_get_multiple_and_multiple_delete() {
        let (cache, _, _) = test_cache(0);
        cache.set("a", "1".to_string(), None).unwrap();
        cache.set("b", "2".to_string(), None).unwrap();

        let found = cache.get_multiple(&["a", "missing"]);
        assert_eq!(found.len(), 2);
        assert_eq!(found["a"], Some("1".to_string()));
        assert_eq!(found["missing"], None);

        assert_eq!(cache.multiple_delete(&["a", "b", "missing"]), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_ttl_rewrites_expiry() {
        let (cache, _, clock) = test_cache(0);
        cache.set("k", "v".to_string(), Some(5)).unwrap();

        assert!(cache.ttl("k", 100).unwrap());
        clock.advance(Duration::from_secs(50));
        assert_eq!(cache.get("k"), Some("v".to_string()));
        assert_eq!(cache.get_ttl("k"), Some(TtlRemaining::Seconds(50)));

        assert!(!cache.ttl("missing", 100).unwrap());
        assert_eq!(cache.get_ttl("missing"), None);
    }

    #[test]
    fn test_get_ttl_positive_while_entry_is_live() {
        let (cache, _, clock) = test_cache(0);

        cache.set("short", "v".to_string(), Some(1)).unwrap();
        clock.advance(Duration::from_millis(400));
        assert_eq!(cache.get("short"), Some("v".to_string()));
        assert_eq!(cache.get_ttl("short"), Some(TtlRemaining::Seconds(1)));

        cache.set("huge", "v".to_string(), Some(u64::MAX)).unwrap();
        assert_eq!(cache.get("huge"), Some("v".to_string()));
        assert_eq!(cache.get_ttl("huge"), Some(TtlRemaining::Seconds(i64::MAX)));
    }

    #[test]
    fn test_destroy_clears_and_cancels_sweep() {
        let (cache, scheduler, _) = test_cache(0);
        cache.set("k", "v".to_string(), None).unwrap();

        cache.destroy();
        assert_eq!(scheduler.active_count(), 0);
        assert_eq!(scheduler.tick(), 0);
    }

    #[test]
    fn test_drop_cancels_sweep() {
        let (cache, scheduler, _) = test_cache(0);
        drop(cache);
        assert_eq!(scheduler.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_sweep_removes_expired_entries() {
        let scheduler = TokioScheduler::current().unwrap();
        let clock = MockClock::at(0);
        let cache = ExpiringCache::with_clock(
            CacheOptions {
                default_ttl: 60,
                check_interval: 1,
                max_keys: 0,
            },
            &scheduler,
            Arc::new(clock.clone()),
        )
        .unwrap();

        cache.set("expire_soon", "value".to_string(), Some(1)).unwrap();
        cache.set("long_lived", "value".to_string(), Some(3600)).unwrap();

        clock.advance(Duration::from_secs(2));
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(!cache.has("expire_soon"), "Expired entry should have been swept");
        assert!(cache.has("long_lived"), "Valid entry should not be removed");

        cache.destroy();
    }
}
