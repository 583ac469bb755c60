//! Chaining: deriving new deferred values from existing ones.
//!
//! Every user continuation runs on a later turn of the current runtime, never
//! inside the call that registered or triggered it. Whatever a continuation
//! returns is fed through [`resolve_with`], which flattens nested deferred
//! values and foreign thenables into the derived value.

use super::Deferred;
use super::thenable::{Probe, Resolution, Settle, Thenable};
use crate::error::{Error, catch_panic};
use crate::runtime::schedule;

use tracing::debug;

impl<T, E> Deferred<T, E>
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
{
    /// Derives a new deferred value from this one's outcome.
    ///
    /// Exactly one of the continuations runs, on a later turn, with the value
    /// or reason. Its result settles the returned value:
    /// - `Ok(resolution)` goes through the resolution procedure
    /// - `Err(reason)`, or a panic, rejects it
    ///
    /// # Example
    /// ```ignore
    /// let doubled = d.then(
    ///     |v| Ok(Resolution::Value(v * 2)),
    ///     |_| Ok(Resolution::Value(0)),
    /// );
    /// ```
    pub fn then<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Deferred<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<Resolution<U, E>, E> + 'static,
        R: FnOnce(E) -> Result<Resolution<U, E>, E> + 'static,
    {
        let derived = Deferred::pending();
        let fulfilled_target = derived.clone();
        let rejected_target = derived.clone();

        self.react(
            move |value| settle_from(&fulfilled_target, move || on_fulfilled(value)),
            move |reason| settle_from(&rejected_target, move || on_rejected(reason)),
        );

        derived
    }

    /// `then` with the rejection passed through unchanged.
    pub fn and_then<U, F>(&self, on_fulfilled: F) -> Deferred<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<Resolution<U, E>, E> + 'static,
    {
        self.then(on_fulfilled, Err)
    }

    /// `then` with the value passed through unchanged.
    pub fn catch<R>(&self, on_rejected: R) -> Deferred<T, E>
    where
        R: FnOnce(E) -> Result<Resolution<T, E>, E> + 'static,
    {
        self.then(|value| Ok(Resolution::Value(value)), on_rejected)
    }

    /// Transforms the value with an infallible function.
    pub fn map<U, F>(&self, f: F) -> Deferred<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> U + 'static,
    {
        self.and_then(move |value| Ok(Resolution::Value(f(value))))
    }

    /// Runs `f` on either outcome, then passes the original outcome through.
    ///
    /// If `f` fails, its reason replaces the original outcome.
    pub fn finally<F>(&self, f: F) -> Deferred<T, E>
    where
        F: FnOnce() -> Result<(), E> + 'static,
    {
        let derived = Deferred::pending();
        let target = derived.clone();

        self.react_outcome(move |outcome| {
            settle_from(&target, move || {
                f()?;
                outcome.map(Resolution::Value)
            })
        });

        derived
    }

    /// Registers continuations that run on a later turn once settled.
    ///
    /// Applies uniformly: an already-settled value schedules right away, a
    /// pending one schedules from inside its settlement.
    pub(crate) fn react<F, R>(&self, on_fulfilled: F, on_rejected: R)
    where
        F: FnOnce(T) + 'static,
        R: FnOnce(E) + 'static,
    {
        self.subscribe(
            move |value| schedule(Box::new(move || on_fulfilled(value))),
            move |reason| schedule(Box::new(move || on_rejected(reason))),
        );
    }

    /// Single-callback form of [`react`](Self::react).
    pub(crate) fn react_outcome<F>(&self, callback: F)
    where
        F: FnOnce(Result<T, E>) + 'static,
    {
        self.subscribe_outcome(move |outcome| schedule(Box::new(move || callback(outcome))));
    }
}

// Runs a continuation and settles `derived` with whatever it produced.
fn settle_from<U, E, F>(derived: &Deferred<U, E>, continuation: F)
where
    U: Clone + 'static,
    E: Clone + From<Error> + 'static,
    F: FnOnce() -> Result<Resolution<U, E>, E>,
{
    match catch_panic(continuation) {
        Ok(resolution) => resolve_with(derived, resolution),
        Err(reason) => derived.reject_now(reason),
    }
}

/// The resolution procedure: settles `derived` with an arbitrary resolution.
///
/// 1. `derived` itself rejects with [`Error::CircularReference`]
/// 2. another deferred value has its outcome adopted, now or once it settles
/// 3. a foreign thenable is probed and, if callable, subscribed to through a
///    latched callback pair
/// 4. a plain value fulfills directly
pub(crate) fn resolve_with<T, E>(derived: &Deferred<T, E>, resolution: Resolution<T, E>)
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
{
    match resolution {
        Resolution::Deferred(source) if source.ptr_eq(derived) => {
            debug!("circular reference: deferred value resolved with itself");
            derived.reject_now(E::from(Error::CircularReference));
        }
        Resolution::Deferred(source) => {
            let fulfilled_target = derived.clone();
            let rejected_target = derived.clone();

            source.subscribe(
                move |value| resolve_with(&fulfilled_target, Resolution::Value(value)),
                move |reason| rejected_target.reject_now(reason),
            );
        }
        Resolution::Thenable(thenable) => adopt_thenable(derived, thenable),
        Resolution::Value(value) => derived.fulfill_now(value),
    }
}

fn adopt_thenable<T, E>(derived: &Deferred<T, E>, thenable: Box<dyn Thenable<T, E>>)
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
{
    let then = match catch_panic(move || thenable.probe()) {
        Ok(Probe::Callable(then)) => then,
        Ok(Probe::Plain(value)) => return derived.fulfill_now(value),
        Err(reason) => return derived.reject_now(reason),
    };

    let settle = Settle::new(derived.clone());
    let latch = settle.latch().clone();

    if let Err(reason) = catch_panic(move || then(settle)) {
        if latch.fire() {
            derived.reject_now(reason);
        } else {
            debug!("thenable failed after settling; error ignored");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Runtime;

    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_then_never_runs_synchronously() {
        let mut rt = Runtime::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = log.clone();

        rt.run(move || {
            let inner = l.clone();
            Deferred::<i32>::resolved_with(1).map(move |v| inner.borrow_mut().push(v));
            l.borrow_mut().push(0);
        })
        .unwrap();

        assert_eq!(*log.borrow(), vec![0, 1]);
    }

    #[test]
    fn test_resolve_with_settled_deferred_is_immediate() {
        let derived = Deferred::<i32>::pending();
        resolve_with(&derived, Resolution::Deferred(Deferred::resolved_with(4)));
        assert_eq!(derived.value(), Some(4));

        let derived = Deferred::<i32>::pending();
        resolve_with(
            &derived,
            Resolution::Deferred(Deferred::rejected_with(Error::from("no"))),
        );
        assert_eq!(derived.reason(), Some(Error::from("no")));
    }

    #[test]
    fn test_resolve_with_self_is_circular() {
        let derived = Deferred::<i32>::pending();
        resolve_with(&derived, Resolution::Deferred(derived.clone()));
        assert_eq!(derived.reason(), Some(Error::CircularReference));
    }

    #[test]
    fn test_probe_error_rejects() {
        struct Broken;

        impl Thenable<i32> for Broken {
            fn probe(self: Box<Self>) -> Result<Probe<i32>, Error> {
                Err(Error::from("getter threw"))
            }
        }

        let derived = Deferred::<i32>::pending();
        resolve_with(&derived, Resolution::thenable(Broken));
        assert_eq!(derived.reason(), Some(Error::from("getter threw")));
    }
}
