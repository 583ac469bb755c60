//! Fluent builder for Runtime construction.
//!
//! Provides a builder pattern interface for creating and configuring Runtime instances.

use crate::runtime::Runtime;

/// Builder for constructing Runtime instances with fluent API.
///
/// # Example
/// ```ignore
/// let rt = RuntimeBuilder::new().turn_limit(10_000).queue_capacity(64).build();
/// ```
#[derive(Debug, Clone)]
pub struct RuntimeBuilder {
    turn_limit: Option<usize>,
    queue_capacity: usize,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    /// Creates a new runtime builder with no turn limit and an empty queue.
    ///
    /// # Example
    /// ```ignore
    /// let builder = RuntimeBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self {
            turn_limit: None,
            queue_capacity: 0,
        }
    }

    /// Caps the number of turns a single drain may execute.
    ///
    /// A drain that reaches the cap returns
    /// [`RuntimeError::TurnLimitExceeded`](crate::RuntimeError::TurnLimitExceeded)
    /// and leaves the remaining work queued.
    pub fn turn_limit(mut self, limit: usize) -> Self {
        self.turn_limit = Some(limit);
        self
    }

    /// Pre-allocates room for `capacity` queued turns.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Builds and returns a configured Runtime instance.
    ///
    /// # Example
    /// ```ignore
    /// let rt = RuntimeBuilder::new().build();
    /// ```
    pub fn build(self) -> Runtime {
        Runtime::with_config(self.queue_capacity, self.turn_limit)
    }
}
