//! Janitor Registry
//!
//! Owns pending cleanup tasks until they are cleaned or removed.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, trace};

use super::task::{Task, TaskId};

// == Janitor ==
/// Registry of cleanup tasks keyed by a freshly generated id.
///
/// Dropping a janitor drops its tasks without running them, the same as
/// `destroy()`. Call `clean()` to tear resources down.
#[derive(Default)]
pub struct Janitor {
    tasks: HashMap<TaskId, Task>,
}

impl Janitor {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Add Task ==
    /// Registers `task` under a new id. The same task value may be added
    /// any number of times; each registration gets its own id.
    pub fn add_task(&mut self, task: Task) -> TaskId {
        let mut id = TaskId::random();
        while self.tasks.contains_key(&id) {
            id = TaskId::random();
        }
        trace!(task_id = %id, ?task, "Registered cleanup task");
        self.tasks.insert(id, task);
        id
    }

    // == Remove Task ==
    /// Deregisters one task by id without running it.
    pub fn remove_task(&mut self, id: &TaskId) -> bool {
        self.tasks.remove(id).is_some()
    }

    /// Deregisters every registration of `task` without running them.
    ///
    /// Returns the number of registrations removed.
    pub fn remove_task_value(&mut self, task: &Task) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|_, registered| registered != task);
        before - self.tasks.len()
    }

    // == Clean ==
    /// Runs every registered task once and empties the registry.
    ///
    /// Tasks run in no particular order. The janitor stays usable afterwards.
    pub fn clean(&mut self) {
        let tasks = std::mem::take(&mut self.tasks);
        if tasks.is_empty() {
            return;
        }

        let total = tasks.len();
        let ran = tasks.into_values().filter(|task| task.run()).count();
        debug!(total, ran, skipped = total - ran, "Janitor cleaned tasks");
    }

    // == Destroy ==
    /// Drops every registered task without running any of them.
    pub fn destroy(mut self) {
        let dropped = self.tasks.len();
        self.tasks.clear();
        trace!(dropped, "Janitor destroyed");
    }

    // == Length ==
    /// Returns the number of registered tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    // == Contains ==
    pub fn contains(&self, id: &TaskId) -> bool {
        self.tasks.contains_key(id)
    }
}

impl fmt::Debug for Janitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Janitor")
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::janitor::{Connection, Disposable};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_task(counter: &Arc<AtomicUsize>) -> Task {
        let counter = counter.clone();
        Task::from_callback(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    struct Subscription(AtomicBool);

    impl Connection for Subscription {
        fn is_connected(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }

        fn disconnect(&self) {
            self.0.store(false, Ordering::SeqCst);
        }
    }

    struct Widget(AtomicUsize);

    impl Disposable for Widget {
        fn destroy(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_janitor_new() {
        let janitor = Janitor::new();
        assert!(janitor.is_empty());
        assert_eq!(janitor.len(), 0);
    }

    #[test]
    fn test_clean_runs_every_task_once() {
        let mut janitor = Janitor::new();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            janitor.add_task(counting_task(&counter));
        }
        assert_eq!(janitor.len(), 3);

        janitor.clean();
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert!(janitor.is_empty());

        // Second clean has nothing left to run
        janitor.clean();
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_clean_dispatches_each_shape() {
        let mut janitor = Janitor::new();
        let subscription = Arc::new(Subscription(AtomicBool::new(true)));
        let widget = Arc::new(Widget(AtomicUsize::new(0)));
        let released = Arc::new(AtomicUsize::new(0));
        let sink = released.clone();

        janitor.add_task(Task::from_connection(subscription.clone()));
        janitor.add_task(Task::from_disposable(widget.clone()));
        janitor.add_task(Task::from_destructor(String::from("buffer"), move |name: &String| {
            sink.fetch_add(name.len(), Ordering::SeqCst);
        }));

        janitor.clean();

        assert!(!subscription.is_connected());
        assert_eq!(widget.0.load(Ordering::SeqCst), 1);
        assert_eq!(released.load(Ordering::SeqCst), 6);
        assert!(janitor.is_empty());
    }

    #[test]
    fn test_clean_skips_released_connection() {
        let mut janitor = Janitor::new();
        let subscription = Arc::new(Subscription(AtomicBool::new(false)));

        janitor.add_task(Task::from_connection(subscription));
        janitor.clean();

        assert!(janitor.is_empty(), "Skipped tasks are still removed");
    }

    #[test]
    fn test_janitor_reusable_after_clean() {
        let mut janitor = Janitor::new();
        let counter = Arc::new(AtomicUsize::new(0));

        janitor.add_task(counting_task(&counter));
        janitor.clean();
        janitor.add_task(counting_task(&counter));
        janitor.clean();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_same_value_gets_distinct_ids() {
        let mut janitor = Janitor::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let task = counting_task(&counter);

        let first = janitor.add_task(task.clone());
        let second = janitor.add_task(task.clone());

        assert_ne!(first, second);
        assert_eq!(janitor.len(), 2);

        janitor.clean();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_remove_task_by_id() {
        let mut janitor = Janitor::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let id = janitor.add_task(counting_task(&counter));
        let kept = janitor.add_task(counting_task(&counter));

        assert!(janitor.remove_task(&id));
        assert!(!janitor.remove_task(&id), "Removing twice is harmless");
        assert!(janitor.contains(&kept));

        janitor.clean();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_task_value_removes_all_registrations() {
        let mut janitor = Janitor::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let shared = counting_task(&counter);

        janitor.add_task(shared.clone());
        janitor.add_task(shared.clone());
        janitor.add_task(counting_task(&counter));

        assert_eq!(janitor.remove_task_value(&shared), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 0, "Removal never runs the task");
        assert_eq!(janitor.len(), 1);

        janitor.clean();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_destroy_does_not_run_tasks() {
        let mut janitor = Janitor::new();
        let counter = Arc::new(AtomicUsize::new(0));

        janitor.add_task(counting_task(&counter));
        janitor.add_task(counting_task(&counter));
        janitor.destroy();

        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
