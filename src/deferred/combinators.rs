//! Fan-in combinators aggregating many deferred values into one.
//!
//! Inputs may be deferred values, plain values or foreign thenables; each is
//! normalized into a [`Deferred`] before a continuation is attached. The
//! combined value is built with [`Deferred::new`], so its own once-only
//! settlement is what makes "first wins" hold.

use super::Deferred;
use super::chain::resolve_with;
use super::thenable::Resolution;
use crate::error::Error;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

impl<T, E> Deferred<T, E>
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
{
    /// Wraps any resolution in a deferred value.
    ///
    /// A deferred value is returned as-is; anything else goes through the
    /// resolution procedure, so thenables are adopted.
    pub fn resolve(value: impl Into<Resolution<T, E>>) -> Self {
        match value.into() {
            Resolution::Deferred(deferred) => deferred,
            Resolution::Value(value) => Self::resolved_with(value),
            thenable @ Resolution::Thenable(_) => {
                let deferred = Self::pending();
                resolve_with(&deferred, thenable);
                deferred
            }
        }
    }

    /// Fulfills with every input's value, in input order, once all fulfilled.
    ///
    /// Rejects with the reason of the first input to reject. An empty input
    /// fulfills with an empty vector.
    ///
    /// # Example
    /// ```ignore
    /// let items: Vec<Resolution<i32>> = vec![
    ///     Deferred::resolved_with(1).into(),
    ///     Resolution::Value(2),
    /// ];
    /// Deferred::all(items).map(|values| assert_eq!(values, vec![1, 2]));
    /// ```
    pub fn all<I>(items: I) -> Deferred<Vec<T>, E>
    where
        I: IntoIterator,
        I::Item: Into<Resolution<T, E>>,
    {
        let inputs = normalize(items);

        Deferred::new(move |resolver| {
            if inputs.is_empty() {
                resolver.fulfill(Vec::<T>::new());
                return Ok(());
            }

            let slots: Rc<RefCell<Vec<Option<T>>>> =
                Rc::new(RefCell::new(inputs.iter().map(|_| None).collect()));
            let remaining = Rc::new(Cell::new(inputs.len()));

            for (index, input) in inputs.into_iter().enumerate() {
                let slots = slots.clone();
                let remaining = remaining.clone();
                let on_fulfilled = resolver.clone();
                let on_rejected = resolver.clone();

                input.react(
                    move |value| {
                        slots.borrow_mut()[index] = Some(value);
                        remaining.set(remaining.get() - 1);

                        if remaining.get() == 0 {
                            let values: Vec<T> = slots.borrow_mut().drain(..).flatten().collect();
                            on_fulfilled.fulfill(values);
                        }
                    },
                    move |reason| on_rejected.reject(reason),
                );
            }

            Ok(())
        })
    }

    /// Settles like whichever input settles first.
    ///
    /// An empty input never settles.
    pub fn race<I>(items: I) -> Deferred<T, E>
    where
        I: IntoIterator,
        I::Item: Into<Resolution<T, E>>,
    {
        let inputs = normalize(items);

        Deferred::new(move |resolver| {
            for input in inputs {
                let on_fulfilled = resolver.clone();
                let on_rejected = resolver.clone();

                input.react(
                    move |value| on_fulfilled.fulfill(value),
                    move |reason| on_rejected.reject(reason),
                );
            }

            Ok(())
        })
    }

    /// Fulfills with every input's outcome, in input order, once all settled.
    ///
    /// Never rejects.
    pub fn all_settled<I>(items: I) -> Deferred<Vec<Result<T, E>>, E>
    where
        I: IntoIterator,
        I::Item: Into<Resolution<T, E>>,
    {
        let inputs = normalize(items);

        Deferred::new(move |resolver| {
            if inputs.is_empty() {
                resolver.fulfill(Vec::<Result<T, E>>::new());
                return Ok(());
            }

            let slots: Rc<RefCell<Vec<Option<Result<T, E>>>>> =
                Rc::new(RefCell::new(inputs.iter().map(|_| None).collect()));
            let remaining = Rc::new(Cell::new(inputs.len()));

            for (index, input) in inputs.into_iter().enumerate() {
                let slots = slots.clone();
                let remaining = remaining.clone();
                let resolver = resolver.clone();

                input.react_outcome(move |outcome| {
                    slots.borrow_mut()[index] = Some(outcome);
                    remaining.set(remaining.get() - 1);

                    if remaining.get() == 0 {
                        let outcomes: Vec<Result<T, E>> =
                            slots.borrow_mut().drain(..).flatten().collect();
                        resolver.fulfill(outcomes);
                    }
                });
            }

            Ok(())
        })
    }

    /// Fulfills with the first input to fulfill.
    ///
    /// Rejects with [`Error::AllRejected`] once every input rejected; an empty
    /// input rejects right away.
    pub fn any<I>(items: I) -> Deferred<T, E>
    where
        I: IntoIterator,
        I::Item: Into<Resolution<T, E>>,
    {
        let inputs = normalize(items);

        Deferred::new(move |resolver| {
            let total = inputs.len();
            if total == 0 {
                return Err(E::from(Error::AllRejected(0)));
            }

            let rejected = Rc::new(Cell::new(0));

            for input in inputs {
                let on_fulfilled = resolver.clone();
                let on_rejected = resolver.clone();
                let rejected = rejected.clone();

                input.react(
                    move |value| on_fulfilled.fulfill(value),
                    move |_| {
                        rejected.set(rejected.get() + 1);
                        if rejected.get() == total {
                            on_rejected.reject(E::from(Error::AllRejected(total)));
                        }
                    },
                );
            }

            Ok(())
        })
    }
}

fn normalize<T, E, I>(items: I) -> Vec<Deferred<T, E>>
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
    I: IntoIterator,
    I::Item: Into<Resolution<T, E>>,
{
    items
        .into_iter()
        .map(|item| Deferred::<T, E>::resolve(item))
        .collect()
}
