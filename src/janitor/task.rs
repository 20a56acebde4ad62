//! Cleanup Task Module
//!
//! The shapes of resource a `Janitor` knows how to tear down.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

// == Task Id ==
/// Identifier assigned to a task when it is added to a janitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(Uuid);

impl TaskId {
    pub(crate) fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// == Capability Traits ==
/// A live subscription that can be cut.
pub trait Connection: Send + Sync {
    /// Whether the subscription still delivers.
    fn is_connected(&self) -> bool;

    /// Stops delivery. Called at most once per clean, and only while connected.
    fn disconnect(&self);
}

/// An owned object with its own teardown.
pub trait Disposable: Send + Sync {
    fn destroy(&self);
}

type Payload = Arc<dyn Any + Send + Sync>;
type Destructor = Arc<dyn Fn(&(dyn Any + Send + Sync)) + Send + Sync>;

// == Task ==
/// A cleanup action. Clones compare equal to the original, so one task value
/// can be registered several times and later removed by value.
#[derive(Clone)]
pub enum Task {
    /// Invoked with no arguments
    Callback(Arc<dyn Fn() + Send + Sync>),
    /// Disconnected if still connected
    Connection(Arc<dyn Connection>),
    /// `destroy()` is invoked
    Disposable(Arc<dyn Disposable>),
    /// `destructor(payload)` is invoked
    Destructor {
        destructor: Destructor,
        payload: Payload,
    },
}

impl Task {
    pub fn from_callback<F>(callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Task::Callback(Arc::new(callback))
    }

    pub fn from_connection(connection: Arc<dyn Connection>) -> Self {
        Task::Connection(connection)
    }

    pub fn from_disposable(disposable: Arc<dyn Disposable>) -> Self {
        Task::Disposable(disposable)
    }

    /// Pairs a payload with the function that releases it.
    pub fn from_destructor<P, F>(payload: P, destructor: F) -> Self
    where
        P: Any + Send + Sync,
        F: Fn(&P) + Send + Sync + 'static,
    {
        Task::Destructor {
            destructor: Arc::new(move |payload: &(dyn Any + Send + Sync)| {
                if let Some(payload) = payload.downcast_ref::<P>() {
                    destructor(payload);
                }
            }),
            payload: Arc::new(payload),
        }
    }

    /// Runs the teardown for this task's shape. Returns false when there was
    /// nothing to do.
    pub(crate) fn run(&self) -> bool {
        match self {
            Task::Callback(callback) => {
                callback();
                true
            }
            Task::Connection(connection) => {
                if connection.is_connected() {
                    connection.disconnect();
                    true
                } else {
                    false
                }
            }
            Task::Disposable(disposable) => {
                disposable.destroy();
                true
            }
            Task::Destructor {
                destructor,
                payload,
            } => {
                destructor(payload.as_ref());
                true
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Task::Callback(_) => "Callback",
            Task::Connection(_) => "Connection",
            Task::Disposable(_) => "Disposable",
            Task::Destructor { .. } => "Destructor",
        }
    }
}

// Compares allocations only; vtable pointers may differ across codegen units.
fn same_allocation<T: ?Sized, U: ?Sized>(a: &Arc<T>, b: &Arc<U>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Task::Callback(a), Task::Callback(b)) => same_allocation(a, b),
            (Task::Connection(a), Task::Connection(b)) => same_allocation(a, b),
            (Task::Disposable(a), Task::Disposable(b)) => same_allocation(a, b),
            (
                Task::Destructor {
                    destructor: da,
                    payload: pa,
                },
                Task::Destructor {
                    destructor: db,
                    payload: pb,
                },
            ) => same_allocation(da, db) && same_allocation(pa, pb),
            _ => false,
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Task").field(&self.kind()).finish()
    }
}
