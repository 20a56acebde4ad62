//! Runtime Collaborators
//!
//! Clock and interval scheduling used by the expiring cache.
//!
//! # Shims
//! - `SystemClock` / `MockClock`: current time in milliseconds
//! - `TokioScheduler`: periodic callbacks on a tokio task
//! - `ManualScheduler`: periodic callbacks driven explicitly by `tick()`

mod clock;
mod scheduler;

pub use clock::{Clock, MockClock, SystemClock};
pub use scheduler::{IntervalCallback, IntervalScheduler, ManualScheduler, TokioScheduler};
