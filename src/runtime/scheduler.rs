//! Interval Scheduling
//!
//! Runs a callback roughly every `period`. Each scheduled callback is
//! returned as a `Connection` so a `Janitor` can cancel it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::{debug, info};

use crate::error::{CacheError, Result};
use crate::janitor::Connection;

/// Callback invoked on every scheduler tick.
pub type IntervalCallback = Box<dyn FnMut() + Send + 'static>;

// == Scheduler Trait ==
/// Schedules recurring callbacks.
pub trait IntervalScheduler {
    /// Starts invoking `callback` every `period`; disconnecting the returned
    /// handle stops future invocations.
    fn schedule(&self, period: Duration, callback: IntervalCallback) -> Arc<dyn Connection>;
}

// == Tokio Scheduler ==
/// Runs each callback on its own tokio task.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    runtime: Handle,
}

impl TokioScheduler {
    /// Binds to the runtime the caller is running in.
    pub fn current() -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| CacheError::NoRuntime(e.to_string()))?;
        Ok(Self { runtime })
    }

    /// Binds to an explicit runtime handle.
    pub fn with_handle(runtime: Handle) -> Self {
        Self { runtime }
    }
}

impl IntervalScheduler for TokioScheduler {
    /// The task sleeps for `period` between callback runs, so the first run
    /// happens one full period after scheduling.
    fn schedule(&self, period: Duration, mut callback: IntervalCallback) -> Arc<dyn Connection> {
        let handle = self.runtime.spawn(async move {
            info!("Starting interval task with period of {:?}", period);

            loop {
                tokio::time::sleep(period).await;
                callback();
            }
        });

        Arc::new(handle.abort_handle())
    }
}

impl Connection for AbortHandle {
    fn is_connected(&self) -> bool {
        !self.is_finished()
    }

    fn disconnect(&self) {
        debug!("Aborting interval task");
        self.abort();
    }
}

// == Manual Scheduler ==
/// Scheduler whose callbacks only run when `tick()` is called.
///
/// Clones share the same registrations.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    slots: Arc<Mutex<Vec<ManualSlot>>>,
}

struct ManualSlot {
    period: Duration,
    active: Arc<AtomicBool>,
    callback: IntervalCallback,
}

/// Cancellation handle for a `ManualScheduler` registration.
#[derive(Debug)]
pub struct ManualHandle {
    active: Arc<AtomicBool>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every active callback once and returns how many ran.
    ///
    /// Callbacks run outside the slot lock, so they may schedule or cancel
    /// on this scheduler. Registrations made during a tick first run on the
    /// next one.
    pub fn tick(&self) -> usize {
        let mut running = {
            let mut slots = self.slots.lock();
            slots.retain(|slot| slot.active.load(Ordering::SeqCst));
            std::mem::take(&mut *slots)
        };

        let mut ran = 0;
        for slot in running.iter_mut() {
            if slot.active.load(Ordering::SeqCst) {
                (slot.callback)();
                ran += 1;
            }
        }

        let mut slots = self.slots.lock();
        running.append(&mut slots);
        *slots = running;
        ran
    }

    /// Number of registrations that have not been cancelled.
    pub fn active_count(&self) -> usize {
        self.slots
            .lock()
            .iter()
            .filter(|slot| slot.active.load(Ordering::SeqCst))
            .count()
    }

    /// Periods of the active registrations, in registration order.
    pub fn periods(&self) -> Vec<Duration> {
        self.slots
            .lock()
            .iter()
            .filter(|slot| slot.active.load(Ordering::SeqCst))
            .map(|slot| slot.period)
            .collect()
    }
}

impl IntervalScheduler for ManualScheduler {
    fn schedule(&self, period: Duration, callback: IntervalCallback) -> Arc<dyn Connection> {
        let active = Arc::new(AtomicBool::new(true));
        self.slots.lock().push(ManualSlot {
            period,
            active: active.clone(),
            callback,
        });
        Arc::new(ManualHandle { active })
    }
}

impl Connection for ManualHandle {
    fn is_connected(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn disconnect(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}
