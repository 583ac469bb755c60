//! Runtime that drains scheduled continuations turn by turn.
//!
//! The runtime owns a task queue and enters it as the thread-local context so
//! deferred values can schedule continuations without an explicit handle. It
//! can run a closure and drain the resulting work, or drive a future to
//! completion via `block_on`.

use crate::error::RuntimeError;
use crate::runtime::context::enter_context;
use crate::runtime::queue::TaskQueue;
use crate::runtime::waker::{NotifyFlag, make_waker};

use std::future::Future;
use std::rc::Rc;
use std::task::{Context, Poll};

use tracing::{debug_span, trace};

/// Single-threaded host for deferred values.
///
/// Every continuation attached to a [`Deferred`](crate::Deferred) runs as one
/// turn of this runtime, in FIFO order, never inside the call that scheduled it.
pub struct Runtime {
    queue: Rc<TaskQueue>,
    turn_limit: Option<usize>,
}

impl Runtime {
    /// Creates a runtime with an empty queue and no turn limit.
    ///
    /// # Example
    /// ```ignore
    /// let rt = Runtime::new();
    /// ```
    pub fn new() -> Self {
        Self::with_config(0, None)
    }

    pub(crate) fn with_config(queue_capacity: usize, turn_limit: Option<usize>) -> Self {
        Self {
            queue: Rc::new(TaskQueue::with_capacity(queue_capacity)),
            turn_limit,
        }
    }

    /// Runs `function` inside this runtime's context without draining the queue.
    ///
    /// Continuations scheduled by `function` stay queued until the next
    /// [`run`](Self::run), [`run_until_idle`](Self::run_until_idle) or
    /// [`block_on`](Self::block_on).
    pub fn enter<F, R>(&self, function: F) -> R
    where
        F: FnOnce() -> R,
    {
        enter_context(self.queue.clone(), function)
    }

    /// Runs `function` inside this runtime's context, then drains every turn it
    /// caused.
    ///
    /// # Example
    /// ```ignore
    /// let mut rt = Runtime::new();
    /// rt.run(|| {
    ///     Deferred::<i32>::resolved_with(1).map(|v| println!("{v}"));
    /// })?;
    /// ```
    pub fn run<F, R>(&mut self, function: F) -> Result<R, RuntimeError>
    where
        F: FnOnce() -> R,
    {
        let result = self.enter(function);
        self.run_until_idle()?;

        Ok(result)
    }

    /// Executes queued turns until the queue is empty.
    ///
    /// Returns the number of turns executed.
    ///
    /// # Errors
    /// [`RuntimeError::TurnLimitExceeded`] if the configured limit is reached
    /// while work is still queued. Remaining jobs stay in the queue.
    pub fn run_until_idle(&mut self) -> Result<usize, RuntimeError> {
        let span = debug_span!("drain", queued = self.queue.len());
        let _enter = span.enter();

        let queue = self.queue.clone();
        let turn_limit = self.turn_limit;

        enter_context(queue.clone(), || {
            let mut turns = 0;

            while !queue.is_empty() {
                if let Some(limit) = turn_limit
                    && turns >= limit
                {
                    return Err(RuntimeError::TurnLimitExceeded { limit });
                }

                if let Some(job) = queue.pop() {
                    job();
                    turns += 1;
                }
            }

            trace!(turns, "runtime idle");
            Ok(turns)
        })
    }

    /// Returns the number of turns currently queued.
    pub fn pending_tasks(&self) -> usize {
        self.queue.len()
    }

    /// Drives `fut` to completion, draining queued turns whenever it is pending.
    ///
    /// # Errors
    /// - [`RuntimeError::Stalled`] if the queue runs dry and nothing woke the
    ///   future, e.g. when awaiting `Deferred::race` over no inputs.
    /// - [`RuntimeError::TurnLimitExceeded`] if a drain hits the turn limit.
    ///
    /// # Example
    /// ```ignore
    /// let mut rt = Runtime::new();
    /// let result = rt.block_on(async { Deferred::<i32>::resolved_with(42).await });
    /// assert_eq!(result, Ok(Ok(42)));
    /// ```
    pub fn block_on<F: Future>(&mut self, fut: F) -> Result<F::Output, RuntimeError> {
        let flag = NotifyFlag::new();
        let waker = make_waker(flag.clone());
        let mut cx = Context::from_waker(&waker);
        let mut fut = Box::pin(fut);

        loop {
            let poll = self.enter(|| fut.as_mut().poll(&mut cx));

            if let Poll::Ready(val) = poll {
                self.run_until_idle()?;
                return Ok(val);
            }

            self.run_until_idle()?;

            if !flag.take() {
                return Err(RuntimeError::Stalled);
            }
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::context::schedule;

    use std::cell::RefCell;

    #[test]
    fn test_run_drains_nested_turns() {
        let mut rt = Runtime::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = log.clone();

        rt.run(move || {
            let l2 = l.clone();
            schedule(Box::new(move || {
                l2.borrow_mut().push("first");
                let l3 = l2.clone();
                schedule(Box::new(move || l3.borrow_mut().push("third")));
            }));
            let l4 = l.clone();
            schedule(Box::new(move || l4.borrow_mut().push("second")));
        })
        .unwrap();

        assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
        assert_eq!(rt.pending_tasks(), 0);
    }

    #[test]
    fn test_enter_does_not_drain() {
        let mut rt = Runtime::new();
        rt.enter(|| schedule(Box::new(|| {})));

        assert_eq!(rt.pending_tasks(), 1);
        assert_eq!(rt.run_until_idle(), Ok(1));
    }

    #[test]
    fn test_turn_limit_stops_runaway_work() {
        fn reschedule() {
            schedule(Box::new(reschedule));
        }

        let mut rt = Runtime::with_config(0, Some(10));
        let result = rt.run(reschedule);

        assert_eq!(result, Err(RuntimeError::TurnLimitExceeded { limit: 10 }));
        assert_eq!(rt.pending_tasks(), 1);
    }

    #[test]
    fn test_block_on_plain_future() {
        let mut rt = Runtime::new();
        assert_eq!(rt.block_on(async { 7 }), Ok(7));
    }

    #[test]
    fn test_block_on_stalls_on_never_woken_future() {
        let mut rt = Runtime::new();
        let result = rt.block_on(std::future::pending::<()>());

        assert_eq!(result, Err(RuntimeError::Stalled));
    }
}
