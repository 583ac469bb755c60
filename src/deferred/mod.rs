//! Deferred values: settlement state and continuation registry.
//!
//! A [`Deferred`] starts out pending and settles at most once, either fulfilled
//! with a value or rejected with a reason. Callbacks registered while it is
//! pending are queued and drained exactly once, in registration order, at the
//! moment of settlement.
//!
//! # How Settlement Works
//!
//! 1. [`Deferred::new`] allocates a pending value and runs the producer
//!    synchronously with a [`Resolver`]
//! 2. The producer (or whoever it handed the resolver to) calls
//!    [`Resolver::fulfill`] or [`Resolver::reject`]
//! 3. The first call wins; the queued callbacks receive the outcome
//! 4. Every later call is ignored
//!
//! Chaining (`then` and friends) lives in [`chain`], fan-in combinators in
//! [`combinators`].

pub(crate) mod chain;
pub(crate) mod combinators;
pub(crate) mod future;
pub(crate) mod thenable;

use crate::error::{Error, catch_panic};
use thenable::Resolution;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::rc::Rc;

use tracing::{debug, trace};

/// Observable settlement state of a [`Deferred`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Not settled yet; continuations are queued.
    Pending,
    /// Settled with a value.
    Fulfilled,
    /// Settled with a reason.
    Rejected,
}

type FulfillCallback<T> = Box<dyn FnOnce(T)>;
type RejectCallback<E> = Box<dyn FnOnce(E)>;

// The value and reason slots only exist once the queues are gone.
enum Settlement<T, E> {
    Pending {
        on_fulfilled: Vec<FulfillCallback<T>>,
        on_rejected: Vec<RejectCallback<E>>,
    },
    Fulfilled(T),
    Rejected(E),
}

/// A container for a result that is not known yet.
///
/// Cloning a `Deferred` yields another handle to the same instance. Values and
/// reasons are cloned out to every continuation.
///
/// # Type Parameters
///
/// * `T` - The fulfillment value type
/// * `E` - The rejection reason type; must absorb the crate's own [`Error`]
///
/// # Example
/// ```ignore
/// let mut rt = Runtime::new();
/// let d = rt.run(|| {
///     Deferred::<i32>::new(|resolver| {
///         resolver.fulfill(41);
///         Ok(())
///     })
///     .map(|v| v + 1)
/// })?;
/// assert_eq!(d.value(), Some(42));
/// ```
pub struct Deferred<T, E = Error> {
    inner: Rc<RefCell<Settlement<T, E>>>,
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("state", &self.state())
            .finish()
    }
}

impl<T, E> Deferred<T, E> {
    /// Returns the current settlement state.
    pub fn state(&self) -> State {
        match &*self.inner.borrow() {
            Settlement::Pending { .. } => State::Pending,
            Settlement::Fulfilled(_) => State::Fulfilled,
            Settlement::Rejected(_) => State::Rejected,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state() == State::Pending
    }

    /// Returns true if both handles refer to the same instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T, E> Deferred<T, E>
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
{
    /// Creates a deferred value and runs `producer` synchronously.
    ///
    /// The producer receives a [`Resolver`] it may use immediately or store for
    /// later. An `Err` returned by the producer, or a panic inside it, rejects
    /// the value unless it was already settled.
    pub fn new<P>(producer: P) -> Self
    where
        P: FnOnce(Resolver<T, E>) -> Result<(), E>,
    {
        let deferred = Self::pending();
        let resolver = Resolver {
            deferred: deferred.clone(),
        };

        let handle = resolver.clone();
        if let Err(reason) = catch_panic(move || producer(handle)) {
            resolver.reject(reason);
        }

        deferred
    }

    /// Creates a deferred value already fulfilled with `value`.
    pub fn resolved_with(value: T) -> Self {
        Self::settled(Settlement::Fulfilled(value))
    }

    /// Creates a deferred value already rejected with `reason`.
    pub fn rejected_with(reason: E) -> Self {
        Self::settled(Settlement::Rejected(reason))
    }

    /// Returns the fulfillment value, if fulfilled.
    pub fn value(&self) -> Option<T> {
        match &*self.inner.borrow() {
            Settlement::Fulfilled(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Returns the rejection reason, if rejected.
    pub fn reason(&self) -> Option<E> {
        match &*self.inner.borrow() {
            Settlement::Rejected(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    pub(crate) fn pending() -> Self {
        Self::settled(Settlement::Pending {
            on_fulfilled: Vec::new(),
            on_rejected: Vec::new(),
        })
    }

    fn settled(settlement: Settlement<T, E>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(settlement)),
        }
    }

    /// Transitions `Pending -> Fulfilled` and drains the fulfillment queue.
    ///
    /// No-op if already settled.
    pub(crate) fn fulfill_now(&self, value: T) {
        let callbacks = {
            let mut settlement = self.inner.borrow_mut();

            if !matches!(*settlement, Settlement::Pending { .. }) {
                trace!("fulfillment ignored: already settled");
                return;
            }

            let previous = mem::replace(&mut *settlement, Settlement::Fulfilled(value.clone()));
            let Settlement::Pending { on_fulfilled, .. } = previous else {
                return;
            };
            on_fulfilled
        };

        trace!(callbacks = callbacks.len(), "fulfilled");
        for callback in callbacks {
            callback(value.clone());
        }
    }

    /// Transitions `Pending -> Rejected` and drains the rejection queue.
    ///
    /// No-op if already settled.
    pub(crate) fn reject_now(&self, reason: E) {
        let callbacks = {
            let mut settlement = self.inner.borrow_mut();

            if !matches!(*settlement, Settlement::Pending { .. }) {
                trace!("rejection ignored: already settled");
                return;
            }

            let previous = mem::replace(&mut *settlement, Settlement::Rejected(reason.clone()));
            let Settlement::Pending { on_rejected, .. } = previous else {
                return;
            };
            on_rejected
        };

        trace!(callbacks = callbacks.len(), "rejected");
        for callback in callbacks {
            callback(reason.clone());
        }
    }

    /// Registers raw settlement callbacks.
    ///
    /// While pending they are queued; once settled the matching callback runs
    /// synchronously. Continuations meant for user code go through
    /// [`Deferred::react`] instead, which defers them to a later turn.
    pub(crate) fn subscribe<F, R>(&self, on_fulfilled: F, on_rejected: R)
    where
        F: FnOnce(T) + 'static,
        R: FnOnce(E) + 'static,
    {
        let outcome = {
            let mut settlement = self.inner.borrow_mut();
            match &mut *settlement {
                Settlement::Pending {
                    on_fulfilled: fulfilled_queue,
                    on_rejected: rejected_queue,
                } => {
                    fulfilled_queue.push(Box::new(on_fulfilled));
                    rejected_queue.push(Box::new(on_rejected));
                    return;
                }
                Settlement::Fulfilled(value) => Ok(value.clone()),
                Settlement::Rejected(reason) => Err(reason.clone()),
            }
        };

        match outcome {
            Ok(value) => on_fulfilled(value),
            Err(reason) => on_rejected(reason),
        }
    }

    /// Registers one callback for whichever outcome arrives.
    pub(crate) fn subscribe_outcome<F>(&self, callback: F)
    where
        F: FnOnce(Result<T, E>) + 'static,
    {
        let on_fulfilled = Rc::new(Cell::new(Some(callback)));
        let on_rejected = on_fulfilled.clone();

        self.subscribe(
            move |value| {
                if let Some(callback) = on_fulfilled.take() {
                    callback(Ok(value));
                }
            },
            move |reason| {
                if let Some(callback) = on_rejected.take() {
                    callback(Err(reason));
                }
            },
        );
    }
}

/// The completion handles passed to a producer.
///
/// `fulfill` and `reject` only take effect on the first successful call;
/// every later call, of either kind, is silently ignored. The resolver is
/// cheap to clone and can be stored and invoked from any later turn.
pub struct Resolver<T, E = Error> {
    deferred: Deferred<T, E>,
}

impl<T, E> Clone for Resolver<T, E> {
    fn clone(&self) -> Self {
        Self {
            deferred: self.deferred.clone(),
        }
    }
}

impl<T, E> Resolver<T, E>
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
{
    /// Fulfills the deferred value.
    ///
    /// - A plain value settles immediately.
    /// - Another [`Deferred`] is followed instead: this resolver is attached
    ///   to it as a continuation, so the outcome is adopted on a later turn.
    ///   Following itself rejects with [`Error::CircularReference`].
    /// - A foreign thenable goes through the full resolution procedure.
    pub fn fulfill(&self, value: impl Into<Resolution<T, E>>) {
        match value.into() {
            Resolution::Value(value) => self.deferred.fulfill_now(value),
            Resolution::Deferred(source) => {
                if source.ptr_eq(&self.deferred) {
                    debug!("deferred value fulfilled with itself");
                    self.reject(E::from(Error::CircularReference));
                    return;
                }

                if !self.deferred.is_pending() {
                    trace!("fulfillment ignored: already settled");
                    return;
                }

                let on_fulfilled = self.clone();
                let on_rejected = self.clone();
                source.react(
                    move |value| on_fulfilled.fulfill(value),
                    move |reason| on_rejected.reject(reason),
                );
            }
            thenable @ Resolution::Thenable(_) => chain::resolve_with(&self.deferred, thenable),
        }
    }

    /// Rejects the deferred value with `reason`.
    pub fn reject(&self, reason: E) {
        self.deferred.reject_now(reason);
    }

    pub fn is_settled(&self) -> bool {
        !self.deferred.is_pending()
    }
}
