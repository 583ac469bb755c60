//! Thread-local runtime context for scheduling continuations.
//!
//! Deferred values never hold a runtime handle. When a continuation has to run
//! on a later turn it is pushed onto the queue of the runtime currently entered
//! on this thread.
//!
//! # Usage
//!
//! This module is not intended for direct use. [`Runtime`](crate::Runtime)
//! enters a context around every `enter`, `run` and `block_on`, and the
//! chaining code calls [`schedule`].

use crate::runtime::queue::{Job, TaskQueue};

use std::cell::RefCell;
use std::rc::Rc;

thread_local! {
    /// Thread-local storage for the current runtime's task queue.
    ///
    /// Set by [`enter_context`] and restored to its previous value on exit.
    pub(crate) static CURRENT_QUEUE: RefCell<Option<Rc<TaskQueue>>> = const { RefCell::new(None) };
}

/// Enters a runtime context for the current thread.
///
/// Sets the task queue in thread-local storage, executes `function`, then
/// restores the previous queue so contexts nest.
pub(crate) fn enter_context<F, R>(queue: Rc<TaskQueue>, function: F) -> R
where
    F: FnOnce() -> R,
{
    let previous = CURRENT_QUEUE.with(|current| current.borrow_mut().replace(queue));

    // Restored on unwind as well.
    struct Restore(Option<Rc<TaskQueue>>);

    impl Drop for Restore {
        fn drop(&mut self) {
            let previous = self.0.take();
            CURRENT_QUEUE.with(|current| *current.borrow_mut() = previous);
        }
    }

    let _restore = Restore(previous);
    function()
}

/// Schedules a job to run on a later turn of the current runtime.
///
/// # Panics
/// Panics if called outside of a runtime context.
pub(crate) fn schedule(job: Job) {
    CURRENT_QUEUE.with(|current| {
        let current = current.borrow();
        let queue = current
            .as_ref()
            .expect("deferred continuation scheduled outside of a runtime context");

        queue.push(job);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_context() -> bool {
        CURRENT_QUEUE.with(|current| current.borrow().is_some())
    }

    #[test]
    fn test_context_nests_and_restores() {
        let outer = Rc::new(TaskQueue::with_capacity(0));
        let inner = Rc::new(TaskQueue::with_capacity(0));

        assert!(!in_context());

        enter_context(outer.clone(), || {
            schedule(Box::new(|| {}));

            enter_context(inner.clone(), || {
                schedule(Box::new(|| {}));
                schedule(Box::new(|| {}));
            });

            schedule(Box::new(|| {}));
        });

        assert!(!in_context());
        assert_eq!(outer.len(), 2);
        assert_eq!(inner.len(), 2);
    }

    #[test]
    #[should_panic(expected = "outside of a runtime context")]
    fn test_schedule_panics_outside_runtime() {
        schedule(Box::new(|| {}));
    }
}
