//! Deferred Module
//!
//! Single-shot results with chained continuations.
//!
//! A `Deferred<T, E>` starts `Pending` and settles exactly once, either
//! `Fulfilled` with a `T` or `Rejected` with an `E`. Fulfillment callbacks
//! form a waterfall: each one receives the previous one's output. Rejection
//! callbacks all receive the same rejection value.
//!
//! `and_then`, `catch` and `finally` return the same instance, not a derived
//! one, so every consumer of a `Deferred` joins one shared waterfall.
//!
//! Deferreds are single-threaded (`!Send`) and are driven entirely by explicit
//! `resolve`/`reject` calls; nothing here blocks or suspends.

mod combinators;
mod promise;

pub use promise::{Deferred, Rejecter, Resolver, Status};
