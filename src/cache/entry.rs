//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Expiration timestamp (milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

/// Remaining lifetime reported by `get_ttl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlRemaining {
    /// The entry never expires
    Never,
    /// Whole seconds left; zero or negative once the expiry has passed
    Seconds(i64),
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `ttl_seconds` - TTL in seconds, 0 = never expires
    /// * `now` - Current timestamp in milliseconds
    pub fn new(value: V, ttl_seconds: u64, now: u64) -> Self {
        Self {
            value,
            expires_at: expiry_for(ttl_seconds, now),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// Boundary condition: an entry is expired once the current time is
    /// greater than or equal to the expiration time.
    pub fn is_expired_at(&self, now: u64) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Remaining lifetime at `now`, without clamping expired entries to zero.
    ///
    /// Partial seconds round up while the entry is live, so `Seconds(n)` with
    /// `n <= 0` only ever describes an expired entry.
    pub fn ttl_remaining_at(&self, now: u64) -> TtlRemaining {
        let Some(expires) = self.expires_at else {
            return TtlRemaining::Never;
        };

        let remaining_ms = i128::from(expires) - i128::from(now);
        let seconds = if remaining_ms > 0 {
            (remaining_ms + 999) / 1000
        } else {
            remaining_ms / 1000
        };
        TtlRemaining::Seconds(i64::try_from(seconds).unwrap_or(i64::MAX))
    }

    /// Moves the expiry to `ttl_seconds` after `now` (0 = never expires).
    pub fn expire_in(&mut self, ttl_seconds: u64, now: u64) {
        self.expires_at = expiry_for(ttl_seconds, now);
    }
}

// == Utility Functions ==
/// Absolute expiry for a TTL in seconds; 0 means the entry never expires.
pub fn expiry_for(ttl_seconds: u64, now: u64) -> Option<u64> {
    match ttl_seconds {
        0 => None,
        ttl => Some(now.saturating_add(ttl.saturating_mul(1000))),
    }
}
