//! Cache Store Module
//!
//! Entry storage with key limit, lazy expiry on reads and sweeping.
//!
//! Every operation takes the current time explicitly; `ExpiringCache` feeds
//! it from its clock.

use std::collections::{HashMap, HashSet};

use crate::cache::{CacheEntry, CacheStats, TtlRemaining, MAX_KEY_LENGTH};
use crate::config::CacheOptions;
use crate::error::{CacheError, Result};

// == Cache Store ==
/// Entry map with a key limit and TTL support.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Usage statistics
    stats: CacheStats,
    /// TTL in seconds for entries without explicit TTL (0 = never)
    default_ttl: u64,
    /// Maximum number of distinct keys (0 = unlimited)
    max_keys: usize,
}

impl<V: Clone> CacheStore<V> {
    // == Constructor ==
    /// Creates a new CacheStore with the key limit and default TTL from `options`.
    pub fn new(options: &CacheOptions) -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
            default_ttl: options.default_ttl,
            max_keys: options.max_keys,
        }
    }

    // == Set ==
    /// Stores a key-value pair, replacing any existing entry for the key.
    ///
    /// Returns `Ok(false)` without touching the store when the key is new and
    /// the key limit is already reached. Updating an existing key always
    /// succeeds.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `ttl` - TTL in seconds (uses default_ttl if None, 0 = never expires)
    /// * `now` - Current timestamp in milliseconds
    pub fn set(&mut self, key: String, value: V, ttl: Option<u64>, now: u64) -> Result<bool> {
        validate_key(&key)?;

        let is_overwrite = self.entries.contains_key(&key);
        if !is_overwrite && self.max_keys > 0 && self.entries.len() >= self.max_keys {
            self.stats.record_rejected_set();
            return Ok(false);
        }

        let effective_ttl = ttl.unwrap_or(self.default_ttl);
        self.entries
            .insert(key, CacheEntry::new(value, effective_ttl, now));
        self.stats.set_total_entries(self.entries.len());

        Ok(true)
    }

    // == Get ==
    /// Returns the value if present and not expired at `now`.
    ///
    /// Expired entries stay in place until swept or deleted.
    pub fn get(&mut self, key: &str, now: u64) -> Option<V> {
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired_at(now) => {
                self.stats.record_hit();
                Some(entry.value.clone())
            }
            _ => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Take ==
    /// Like `get`, but a hit also removes the entry.
    pub fn take(&mut self, key: &str, now: u64) -> Option<V> {
        let live = self
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now));
        if !live {
            self.stats.record_miss();
            return None;
        }

        let entry = self.entries.remove(key)?;
        self.stats.record_hit();
        self.stats.set_total_entries(self.entries.len());
        Some(entry.value)
    }

    // == Delete ==
    /// Removes an entry by key. Returns 1 if an entry was removed, else 0.
    pub fn delete(&mut self, key: &str) -> usize {
        if self.entries.remove(key).is_some() {
            self.stats.set_total_entries(self.entries.len());
            1
        } else {
            0
        }
    }

    // == Expire ==
    /// Rewrites an existing entry's expiry to `seconds` after `now`.
    ///
    /// Returns false if the key is absent. 0 makes the entry permanent.
    pub fn expire(&mut self, key: &str, seconds: u64, now: u64) -> Result<bool> {
        validate_key(key)?;
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.expire_in(seconds, now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // == TTL Remaining ==
    /// Remaining lifetime of a physically present entry, expired or not.
    pub fn ttl_remaining(&self, key: &str, now: u64) -> Option<TtlRemaining> {
        self.entries
            .get(key)
            .map(|entry| entry.ttl_remaining_at(now))
    }

    // == Keys ==
    /// All physically present keys, including expired ones not yet swept.
    pub fn keys(&self) -> HashSet<String> {
        self.entries.keys().cloned().collect()
    }

    // == Has ==
    /// Presence test that ignores expiry.
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Sweep ==
    /// Removes every entry expired at `now`.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&mut self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));

        let removed = before - self.entries.len();
        self.stats.record_swept(removed);
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    // == Clear ==
    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats.set_total_entries(0);
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Rejects keys that are empty or longer than `MAX_KEY_LENGTH` bytes.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidKey(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}
