//! Cache Module
//!
//! Provides in-memory caching with TTL expiration, a key limit and periodic
//! sweeping.

mod entry;
mod expiring;
mod lookup;
mod stats;
mod store;


// Re-export public types
pub use entry::{CacheEntry, TtlRemaining};
pub use expiring::{CacheItem, ExpiringCache};
pub use lookup::CachedLookup;
pub use stats::CacheStats;
pub use store::CacheStore;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;
