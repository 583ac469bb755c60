#![allow(dead_code)]

use deferred::{Deferred, Resolver};

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;

static INIT_LOGGING: Once = Once::new();

/// Initializes trace-level logging routed through the test writer.
///
/// Safe to call from every test; only the first call installs the subscriber.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Creates a pending deferred value together with its stored resolver.
pub fn pending<T: Clone + 'static>() -> (Deferred<T>, Resolver<T>) {
    let stash = Rc::new(RefCell::new(None));
    let s = stash.clone();

    let deferred = Deferred::new(move |resolver| {
        *s.borrow_mut() = Some(resolver);
        Ok(())
    });

    let resolver = stash
        .borrow_mut()
        .take()
        .expect("producer runs synchronously");

    (deferred, resolver)
}

/// Shared log that continuations push into.
pub fn log<T>() -> Rc<RefCell<Vec<T>>> {
    Rc::new(RefCell::new(Vec::new()))
}
