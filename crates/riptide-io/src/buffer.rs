//! Owned I/O buffers.
//!
//! [`IoBuffer`] is the unit of bulk-read results: an owned byte region plus
//! an optional opaque **guard** that is dropped together with the buffer.
//! The guard slot is how callers attach an obligation to the buffer's
//! lifetime — the admission layer stores a memory-units charge there so the
//! semaphore's budget is credited exactly when the consumer lets go of the
//! bytes.

use std::any::Any;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Owned byte buffer returned by bulk reads.
pub struct IoBuffer {
    data: Box<[u8]>,
    /// Dropped together with the buffer. `None` for untracked buffers.
    guard: Option<Box<dyn Any>>,
}

impl IoBuffer {
    /// An empty, untracked buffer.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Take ownership of `data` as an untracked buffer.
    #[must_use]
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            data: data.into_boxed_slice(),
            guard: None,
        }
    }

    /// A zero-filled buffer of `len` bytes.
    #[must_use]
    pub fn zeroed(len: usize) -> Self {
        Self::from_vec(vec![0; len])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Attach a guard that lives exactly as long as this buffer.
    ///
    /// A buffer holds at most one guard; attaching to an already-guarded
    /// buffer replaces (and drops) the previous guard.
    #[must_use]
    pub fn with_guard(mut self, guard: impl Any) -> Self {
        self.guard = Some(Box::new(guard));
        self
    }

    /// Whether a guard is attached.
    #[must_use]
    pub fn has_guard(&self) -> bool {
        self.guard.is_some()
    }
}

impl Deref for IoBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for IoBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl AsRef<[u8]> for IoBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for IoBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoBuffer")
            .field("len", &self.data.len())
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}
