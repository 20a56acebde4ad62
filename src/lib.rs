//! Lifecycle Kit - expiring cache, resource janitor and deferred results
//!
//! Provides a TTL key-value cache with periodic sweeping, deterministic
//! teardown of heterogeneous resources, and single-shot deferred results with
//! chained continuations.

pub mod cache;
pub mod config;
pub mod deferred;
pub mod error;
pub mod janitor;
pub mod runtime;

pub use cache::{CacheItem, CachedLookup, ExpiringCache, TtlRemaining};
pub use config::{CacheOptions, CacheOptionsOverlay};
pub use deferred::{Deferred, Status};
pub use error::{CacheError, Result};
pub use janitor::{Janitor, Task, TaskId};
