//! Waker used by `Runtime::block_on` for its main future.
//!
//! Waking only raises a notification flag; the runtime loop checks the flag
//! after each drain to decide whether the main future must be polled again.

use futures::task::{ArcWake, waker};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::Waker;

/// Notification flag behind the main-future waker.
pub(crate) struct NotifyFlag {
    notified: AtomicBool,
}

impl NotifyFlag {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            notified: AtomicBool::new(false),
        })
    }

    /// Clears the flag, returning whether it was set.
    pub(crate) fn take(&self) -> bool {
        self.notified.swap(false, Ordering::AcqRel)
    }
}

impl ArcWake for NotifyFlag {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.notified.store(true, Ordering::Release);
    }
}

/// Creates a Waker that sets `flag` when woken.
pub(crate) fn make_waker(flag: Arc<NotifyFlag>) -> Waker {
    waker(flag)
}
