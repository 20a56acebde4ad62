//! Deferred State Machine
//!
//! Pending -> Fulfilled or Pending -> Rejected, exactly once.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

// == Status ==
/// Settlement state of a `Deferred`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    Fulfilled,
    Rejected,
}

type FulfillCallback<T> = Box<dyn FnOnce(T) -> T>;
type RejectCallback<E> = Box<dyn FnOnce(&E)>;
type Finalizer<T, E> = Box<dyn FnOnce(Result<&T, &E>)>;

struct State<T, E> {
    status: Status,
    outcome: Option<Result<T, E>>,
    on_fulfilled: VecDeque<FulfillCallback<T>>,
    on_rejected: Vec<RejectCallback<E>>,
    finalizer: Option<Finalizer<T, E>>,
    finalizer_set: bool,
    // True while the fulfillment waterfall runs
    resolving: bool,
    destroyed: bool,
}

impl<T, E> State<T, E> {
    fn new() -> Self {
        Self {
            status: Status::Pending,
            outcome: None,
            on_fulfilled: VecDeque::new(),
            on_rejected: Vec::new(),
            finalizer: None,
            finalizer_set: false,
            resolving: false,
            destroyed: false,
        }
    }
}

// == Deferred ==
/// Handle to a single-shot result. Clones refer to the same instance.
///
/// No `RefCell` borrow is held while user callbacks run, so callbacks may
/// call back into the instance (for example `reject` from inside a
/// fulfillment callback).
pub struct Deferred<T, E> {
    state: Rc<RefCell<State<T, E>>>,
}

/// Fulfills the `Deferred` it was handed out by.
pub struct Resolver<T, E> {
    state: Rc<RefCell<State<T, E>>>,
}

/// Rejects the `Deferred` it was handed out by.
pub struct Rejecter<T, E> {
    state: Rc<RefCell<State<T, E>>>,
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T, E> Clone for Resolver<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T, E> Clone for Rejecter<T, E> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T, E> Deferred<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    // == Constructors ==
    /// Creates a deferred and runs `executor` inline before returning.
    ///
    /// If the executor returns `Err` while the deferred is still pending, the
    /// deferred is rejected with that error.
    pub fn new<F>(executor: F) -> Self
    where
        F: FnOnce(Resolver<T, E>, Rejecter<T, E>) -> Result<(), E>,
    {
        let deferred = Self::pending();
        let resolver = Resolver {
            state: deferred.state.clone(),
        };
        let rejecter = Rejecter {
            state: deferred.state.clone(),
        };

        if let Err(err) = executor(resolver, rejecter) {
            if deferred.is_pending() {
                deferred.reject(err);
            } else {
                debug!("Executor failed after the deferred settled; failure ignored");
            }
        }

        deferred
    }

    /// Creates a pending deferred to be settled through `resolve`/`reject`.
    pub fn pending() -> Self {
        Self {
            state: Rc::new(RefCell::new(State::new())),
        }
    }

    /// Creates an already fulfilled deferred.
    pub fn resolved(value: T) -> Self {
        let deferred = Self::pending();
        deferred.resolve(value);
        deferred
    }

    /// Creates an already rejected deferred.
    pub fn rejected(err: E) -> Self {
        let deferred = Self::pending();
        deferred.reject(err);
        deferred
    }

    // == Resolve ==
    /// Fulfills the deferred, threading `value` through the fulfillment
    /// callbacks in registration order.
    ///
    /// Each callback's output becomes the next callback's input and the last
    /// output becomes the settled value. A callback that rejects this
    /// deferred stops the waterfall. Resolving a settled deferred, or one
    /// whose waterfall is already running, is logged and ignored.
    pub fn resolve(&self, value: T) {
        {
            let mut state = self.state.borrow_mut();
            if state.destroyed || state.status != Status::Pending || state.resolving {
                warn!(
                    status = ?state.status,
                    resolving = state.resolving,
                    "Ignoring resolve on a deferred that is not pending"
                );
                return;
            }
            state.resolving = true;
        }

        let mut current = value;
        loop {
            let next = self.state.borrow_mut().on_fulfilled.pop_front();
            let Some(callback) = next else {
                break;
            };
            current = callback(current);

            let interrupted = {
                let state = self.state.borrow();
                state.destroyed || state.status != Status::Pending
            };
            if interrupted {
                self.state.borrow_mut().resolving = false;
                return;
            }
        }

        let (finalizer, abandoned) = {
            let mut state = self.state.borrow_mut();
            state.resolving = false;
            state.status = Status::Fulfilled;
            state.outcome = Some(Ok(current.clone()));
            (state.finalizer.take(), std::mem::take(&mut state.on_rejected))
        };
        drop(abandoned);

        if let Some(finalizer) = finalizer {
            finalizer(Ok(&current));
        }
    }

    // == Reject ==
    /// Rejects the deferred and hands `err` to every rejection callback,
    /// then to the finalizer. Rejecting a settled deferred is logged and
    /// ignored.
    pub fn reject(&self, err: E) {
        let (callbacks, finalizer, abandoned) = {
            let mut state = self.state.borrow_mut();
            if state.destroyed || state.status != Status::Pending {
                warn!(status = ?state.status, "Ignoring reject on a deferred that is not pending");
                return;
            }
            state.status = Status::Rejected;
            state.outcome = Some(Err(err.clone()));
            (
                std::mem::take(&mut state.on_rejected),
                state.finalizer.take(),
                std::mem::take(&mut state.on_fulfilled),
            )
        };
        drop(abandoned);

        for callback in callbacks {
            callback(&err);
        }
        if let Some(finalizer) = finalizer {
            finalizer(Err(&err));
        }
    }

    // == Continuations ==
    /// Appends `callback` to the fulfillment waterfall.
    ///
    /// On an already fulfilled deferred the callback runs immediately with
    /// the settled value and its output is discarded. On a rejected one it
    /// is dropped. Returns this same deferred.
    pub fn and_then<F>(&self, callback: F) -> Self
    where
        F: FnOnce(T) -> T + 'static,
    {
        let settled = {
            let mut state = self.state.borrow_mut();
            if state.destroyed {
                return self.clone();
            }
            match state.status {
                Status::Pending => {
                    state.on_fulfilled.push_back(Box::new(callback));
                    return self.clone();
                }
                Status::Rejected => return self.clone(),
                Status::Fulfilled => {}
            }
            match &state.outcome {
                Some(Ok(value)) => value.clone(),
                _ => return self.clone(),
            }
        };

        let _ = callback(settled);
        self.clone()
    }

    /// Registers a rejection callback, or runs it immediately when the
    /// deferred is already rejected. Returns this same deferred.
    pub fn catch<F>(&self, callback: F) -> Self
    where
        F: FnOnce(&E) + 'static,
    {
        let settled = {
            let mut state = self.state.borrow_mut();
            if state.destroyed {
                return self.clone();
            }
            match state.status {
                Status::Pending => {
                    state.on_rejected.push(Box::new(callback));
                    return self.clone();
                }
                Status::Fulfilled => return self.clone(),
                Status::Rejected => {}
            }
            match &state.outcome {
                Some(Err(err)) => err.clone(),
                _ => return self.clone(),
            }
        };

        callback(&settled);
        self.clone()
    }

    /// Sets the finalizer, which runs once with the settled outcome.
    ///
    /// Runs immediately if the deferred has already settled. Only the first
    /// call has any effect; later calls are logged and ignored.
    pub fn finally<F>(&self, finalizer: F) -> Self
    where
        F: FnOnce(Result<&T, &E>) + 'static,
    {
        let settled = {
            let mut state = self.state.borrow_mut();
            if state.destroyed {
                return self.clone();
            }
            if state.finalizer_set {
                warn!("Ignoring second finally on a deferred");
                return self.clone();
            }
            state.finalizer_set = true;
            if state.status == Status::Pending {
                state.finalizer = Some(Box::new(finalizer));
                return self.clone();
            }
            state.outcome.clone()
        };

        if let Some(outcome) = settled {
            finalizer(outcome.as_ref());
        }
        self.clone()
    }

    // == Destroy ==
    /// Drops every callback and the stored outcome. The instance, and every
    /// clone or resolver of it, becomes inert.
    pub fn destroy(self) {
        let released = {
            let mut state = self.state.borrow_mut();
            state.destroyed = true;
            state.resolving = false;
            (
                std::mem::take(&mut state.on_fulfilled),
                std::mem::take(&mut state.on_rejected),
                state.finalizer.take(),
                state.outcome.take(),
            )
        };
        drop(released);
    }

    // == Accessors ==
    pub fn status(&self) -> Status {
        self.state.borrow().status
    }

    /// True until the deferred settles or is destroyed.
    pub fn is_pending(&self) -> bool {
        let state = self.state.borrow();
        state.status == Status::Pending && !state.destroyed
    }

    /// The settled outcome, or `None` while pending.
    pub fn result(&self) -> Option<Result<T, E>> {
        self.state.borrow().outcome.clone()
    }

    /// Whether a `resolve` or `reject` issued now would take effect.
    pub(crate) fn can_settle(&self) -> bool {
        let state = self.state.borrow();
        state.status == Status::Pending && !state.destroyed && !state.resolving
    }
}

impl<T, E> Resolver<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    pub fn resolve(&self, value: T) {
        Deferred {
            state: self.state.clone(),
        }
        .resolve(value);
    }
}

impl<T, E> Rejecter<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    pub fn reject(&self, err: E) {
        Deferred {
            state: self.state.clone(),
        }
        .reject(err);
    }
}

impl<T, E> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_borrow() {
            Ok(state) => f
                .debug_struct("Deferred")
                .field("status", &state.status)
                .field("callbacks", &state.on_fulfilled.len())
                .field("destroyed", &state.destroyed)
                .finish(),
            Err(_) => f.debug_struct("Deferred").finish_non_exhaustive(),
        }
    }
}
