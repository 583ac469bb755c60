//! Awaiting deferred values from async code.
//!
//! A [`Deferred`] converts into a [`DeferredFuture`] through `IntoFuture`, so
//! `d.await` works inside [`Runtime::block_on`](crate::Runtime::block_on).
//! On first poll the future registers a continuation; when it runs, the
//! outcome is stored and the last registered waker is woken.

use super::Deferred;
use crate::error::Error;

use std::cell::RefCell;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

struct Slot<T, E> {
    outcome: Option<Result<T, E>>,
    waker: Option<Waker>,
}

/// A future that resolves with the outcome of a [`Deferred`].
///
/// # Panics
/// Polling schedules a continuation, so it must happen inside a runtime
/// context (for example within `Runtime::block_on`).
pub struct DeferredFuture<T, E = Error> {
    source: Deferred<T, E>,
    slot: Rc<RefCell<Slot<T, E>>>,
    registered: bool,
}

impl<T, E> Future for DeferredFuture<T, E>
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        {
            let mut slot = this.slot.borrow_mut();
            if let Some(outcome) = slot.outcome.take() {
                return Poll::Ready(outcome);
            }
            slot.waker = Some(cx.waker().clone());
        }

        if !this.registered {
            this.registered = true;

            let slot = this.slot.clone();
            this.source.react_outcome(move |outcome| {
                let waker = {
                    let mut slot = slot.borrow_mut();
                    slot.outcome = Some(outcome);
                    slot.waker.take()
                };

                if let Some(waker) = waker {
                    waker.wake();
                }
            });
        }

        Poll::Pending
    }
}

impl<T, E> IntoFuture for Deferred<T, E>
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
{
    type Output = Result<T, E>;
    type IntoFuture = DeferredFuture<T, E>;

    fn into_future(self) -> Self::IntoFuture {
        DeferredFuture {
            source: self,
            slot: Rc::new(RefCell::new(Slot {
                outcome: None,
                waker: None,
            })),
            registered: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Runtime;

    #[test]
    fn test_await_fulfilled() {
        let mut rt = Runtime::new();
        let out = rt.block_on(async { Deferred::<i32>::resolved_with(5).await });

        assert_eq!(out, Ok(Ok(5)));
    }

    #[test]
    fn test_await_rejected() {
        let mut rt = Runtime::new();
        let out = rt.block_on(async { Deferred::<i32>::rejected_with(Error::from("nope")).await });

        assert_eq!(out, Ok(Err(Error::from("nope"))));
    }

    #[test]
    fn test_await_never_settling_stalls() {
        let mut rt = Runtime::new();
        let out = rt.block_on(async { Deferred::<i32>::new(|_| Ok(())).await });

        assert_eq!(out, Err(crate::RuntimeError::Stalled));
    }
}
