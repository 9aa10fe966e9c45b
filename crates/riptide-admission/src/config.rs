//! Semaphore construction options.

use serde::{Deserialize, Serialize};

fn unbounded_queue() -> usize {
    usize::MAX
}

/// Construction options for a [`ReadSemaphore`](crate::ReadSemaphore).
///
/// Loadable from engine configuration; the prethrow diagnostic hook is a
/// closure and is installed separately via
/// [`ReadSemaphore::set_prethrow_action`](crate::ReadSemaphore::set_prethrow_action).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemaphoreConfig {
    /// Identifier embedded in admission errors.
    pub name: String,
    /// Reader slot capacity.
    pub count: u32,
    /// Memory capacity in bytes.
    pub memory: u64,
    /// Admission-queue cap; waiters beyond it are rejected with a
    /// queue-overload error. Unbounded when omitted.
    #[serde(default = "unbounded_queue")]
    pub max_queue_length: usize,
}

impl SemaphoreConfig {
    /// Options for a semaphore named `name` with the given slot and memory
    /// capacity and an unbounded admission queue.
    #[must_use]
    pub fn new(name: impl Into<String>, count: u32, memory: u64) -> Self {
        Self {
            name: name.into(),
            count,
            memory,
            max_queue_length: unbounded_queue(),
        }
    }

    /// Cap the admission queue at `len` waiters.
    #[must_use]
    pub fn with_max_queue_length(mut self, len: usize) -> Self {
        self.max_queue_length = len;
        self
    }
}
