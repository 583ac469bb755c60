//! Foreign thenable interop.
//!
//! Anything that can hand out a callable `then` taking a resolve/reject pair can
//! be adopted by a [`Deferred`]. The check is a capability probe rather than a
//! type relationship: [`Thenable::probe`] either yields the `then` operation or
//! reports that the object is a plain value after all.

use super::Deferred;
use super::chain::resolve_with;
use crate::error::Error;

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

/// Anything a continuation or producer can settle a deferred value with.
pub enum Resolution<T, E = Error> {
    /// A plain value, used as-is.
    Value(T),
    /// One of our own deferred values, whose outcome is adopted.
    Deferred(Deferred<T, E>),
    /// A foreign thenable, probed and subscribed to.
    Thenable(Box<dyn Thenable<T, E>>),
}

impl<T, E> Resolution<T, E> {
    /// Wraps a foreign thenable.
    pub fn thenable(thenable: impl Thenable<T, E> + 'static) -> Self {
        Resolution::Thenable(Box::new(thenable))
    }
}

impl<T, E> From<T> for Resolution<T, E> {
    fn from(value: T) -> Self {
        Resolution::Value(value)
    }
}

impl<T, E> From<Deferred<T, E>> for Resolution<T, E> {
    fn from(deferred: Deferred<T, E>) -> Self {
        Resolution::Deferred(deferred)
    }
}

impl<T, E> fmt::Debug for Resolution<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Value(_) => f.write_str("Value(..)"),
            Resolution::Deferred(deferred) => f.debug_tuple("Deferred").field(deferred).finish(),
            Resolution::Thenable(_) => f.write_str("Thenable(..)"),
        }
    }
}

/// The `then` operation of a foreign thenable.
///
/// It receives the guarded callback pair and may call it now, later, or
/// several times; only the first call counts. Returning `Err` is the
/// equivalent of `then` throwing.
pub type ThenFn<T, E = Error> = Box<dyn FnOnce(Settle<T, E>) -> Result<(), E>>;

/// Outcome of probing an object for a `then` member.
pub enum Probe<T, E = Error> {
    /// The object exposes a callable `then`.
    Callable(ThenFn<T, E>),
    /// The object has no callable `then` and is itself the value.
    Plain(T),
}

/// Capability trait for foreign deferred-like objects.
pub trait Thenable<T, E = Error> {
    /// Reads the object's `then` member.
    ///
    /// An `Err` rejects the adopting value with that reason.
    fn probe(self: Box<Self>) -> Result<Probe<T, E>, E>;
}

struct FnThenable<F>(F);

impl<T, E, F> Thenable<T, E> for FnThenable<F>
where
    F: FnOnce(Settle<T, E>) -> Result<(), E> + 'static,
{
    fn probe(self: Box<Self>) -> Result<Probe<T, E>, E> {
        Ok(Probe::Callable(Box::new(self.0)))
    }
}

/// Builds a foreign thenable from a closure standing in for its `then`.
///
/// # Example
/// ```ignore
/// let five = thenable(|settle: Settle<i32>| {
///     settle.resolve(5);
///     Ok(())
/// });
/// let d = Deferred::resolve(five);
/// ```
pub fn thenable<T, E, F>(then: F) -> Resolution<T, E>
where
    F: FnOnce(Settle<T, E>) -> Result<(), E> + 'static,
{
    Resolution::thenable(FnThenable(then))
}

/// Our own deferred values are thenables too, so other systems built on this
/// trait can adopt them.
impl<T, E> Thenable<T, E> for Deferred<T, E>
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
{
    fn probe(self: Box<Self>) -> Result<Probe<T, E>, E> {
        Ok(Probe::Callable(Box::new(move |settle: Settle<T, E>| {
            let on_rejected = settle.clone();
            self.react(
                move |value| settle.resolve(value),
                move |reason| on_rejected.reject(reason),
            );
            Ok(())
        })))
    }
}

/// One-shot latch shared by a resolve/reject callback pair.
#[derive(Debug, Clone, Default)]
pub struct Latch {
    fired: Rc<Cell<bool>>,
}

impl Latch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the latch, returning true only for the first call.
    pub fn fire(&self) -> bool {
        !self.fired.replace(true)
    }

    pub fn is_fired(&self) -> bool {
        self.fired.get()
    }
}

/// The guarded callback pair handed to a foreign `then`.
///
/// Whichever of [`resolve`](Self::resolve) and [`reject`](Self::reject) is
/// called first takes effect; every later call on any clone is ignored.
pub struct Settle<T, E = Error> {
    target: Deferred<T, E>,
    latch: Latch,
}

impl<T, E> Clone for Settle<T, E> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            latch: self.latch.clone(),
        }
    }
}

impl<T, E> Settle<T, E>
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
{
    pub(crate) fn new(target: Deferred<T, E>) -> Self {
        Self {
            target,
            latch: Latch::new(),
        }
    }

    /// Resolves the target, recursing through the resolution procedure.
    pub fn resolve(&self, value: impl Into<Resolution<T, E>>) {
        if self.latch.fire() {
            resolve_with(&self.target, value.into());
        } else {
            trace!("thenable resolve ignored: latch already fired");
        }
    }

    /// Rejects the target.
    pub fn reject(&self, reason: E) {
        if self.latch.fire() {
            self.target.reject_now(reason);
        } else {
            trace!("thenable reject ignored: latch already fired");
        }
    }

    pub(crate) fn latch(&self) -> &Latch {
        &self.latch
    }
}
