//! Single-threaded deferred values with chaining and fan-in combinators.
//!
//! A [`Deferred`] is a container for a result that is not known yet. Producers
//! settle it exactly once through a [`Resolver`]; consumers attach continuations
//! with [`Deferred::then`] and friends, before or after the result exists.
//!
//! # Architecture
//!
//! - **Deferred**: settlement state machine (pending, fulfilled, rejected) and
//!   the continuation queues drained when it settles
//! - **Chaining**: `then`, `and_then`, `catch`, `map`, `finally` and the
//!   resolution procedure that flattens nested deferred values and thenables
//! - **Thenable**: capability trait for foreign deferred-like objects
//! - **Combinators**: `all`, `race`, `all_settled`, `any`
//! - **Runtime**: FIFO task queue that runs every continuation on a later turn
//! - **RuntimeBuilder**: fluent builder for runtime configuration
//!
//! # Example
//!
//! ```ignore
//! use deferred::{Deferred, Resolution, Runtime};
//!
//! let mut rt = Runtime::new();
//! let out = rt.block_on(async {
//!     Deferred::<i32>::resolved_with(41)
//!         .map(|v| v + 1)
//!         .await
//! });
//! assert_eq!(out.unwrap(), Ok(42));
//! ```

mod builder;
mod deferred;
mod error;
mod runtime;

pub use builder::RuntimeBuilder;
pub use deferred::future::DeferredFuture;
pub use deferred::thenable::{Latch, Probe, Resolution, Settle, ThenFn, Thenable, thenable};
pub use deferred::{Deferred, Resolver, State};
pub use error::{Error, RuntimeError};
pub use runtime::Runtime;
