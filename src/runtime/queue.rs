//! Single-threaded task queue for scheduled continuations.
//!
//! Provides a FIFO queue of jobs. Each job popped and run is one "turn" of the
//! runtime; continuations are pushed here instead of running synchronously.

use std::cell::RefCell;
use std::collections::VecDeque;

/// A unit of deferred work.
pub(crate) type Job = Box<dyn FnOnce()>;

/// A FIFO queue of jobs waiting for their turn.
///
/// Interior mutability lets jobs schedule further jobs while the runtime is
/// draining; the borrow is never held while a job runs.
pub(crate) struct TaskQueue {
    jobs: RefCell<VecDeque<Job>>,
}

impl TaskQueue {
    /// Creates an empty queue with room for `capacity` jobs.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            jobs: RefCell::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Enqueues a job at the back of the queue.
    pub(crate) fn push(&self, job: Job) {
        self.jobs.borrow_mut().push_back(job);
    }

    /// Dequeues the next job, if any.
    pub(crate) fn pop(&self) -> Option<Job> {
        self.jobs.borrow_mut().pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.jobs.borrow().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.jobs.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_fifo_order() {
        let queue = TaskQueue::with_capacity(0);
        let seen = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let seen = seen.clone();
            queue.push(Box::new(move || seen.borrow_mut().push(i)));
        }
        assert_eq!(queue.len(), 3);

        while let Some(job) = queue.pop() {
            job();
        }

        assert!(queue.is_empty());
        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_job_can_push_while_draining() {
        let queue = Rc::new(TaskQueue::with_capacity(4));
        let q = queue.clone();
        queue.push(Box::new(move || q.push(Box::new(|| {}))));

        let job = queue.pop().unwrap();
        job();

        assert_eq!(queue.len(), 1);
    }
}
