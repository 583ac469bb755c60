//! Runtime subsystem modules.

pub(crate) mod context;
mod core;
pub(crate) mod queue;
pub(crate) mod waker;

pub(crate) use context::schedule;
pub use core::Runtime;
