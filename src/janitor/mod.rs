//! Janitor Module
//!
//! Deterministic teardown of heterogeneous resources.
//!
//! A `Janitor` owns a set of cleanup `Task`s. `clean()` runs every task once
//! and empties the registry; `destroy()` drops the registry without running
//! anything.

mod registry;
mod task;

pub use registry::Janitor;
pub use task::{Connection, Disposable, Task, TaskId};
