//! Cancellation context (`Cx`).
//!
//! A `Cx` is a cheaply cloneable handle threaded through every operation
//! that can block or suspend. Long-running work calls [`Cx::checkpoint`] at
//! its yield points; once some owner has called [`Cx::cancel`], the next
//! checkpoint observes it and the operation unwinds with a cancellation
//! error instead of continuing.
//!
//! The fast path is a single atomic load, so checkpoints are safe to place
//! on hot paths (admission polls, per-operation entry points).

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Cancelled,
}

/// Error produced by an observed cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    #[must_use]
    pub const fn cancelled() -> Self {
        Self {
            kind: ErrorKind::Cancelled,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::Cancelled => write!(f, "operation cancelled"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Default)]
struct CxInner {
    cancel_requested: AtomicBool,
}

/// Cancellation context passed through blocking operations.
///
/// Clones share cancellation state: cancelling any clone cancels them all.
#[derive(Debug, Clone, Default)]
pub struct Cx {
    inner: Arc<CxInner>,
}

impl Cx {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancel_requested.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancel_requested(&self) -> bool {
        self.inner.cancel_requested.load(Ordering::Acquire)
    }

    /// Check for cancellation at a yield point.
    pub fn checkpoint(&self) -> Result<()> {
        if self.inner.cancel_requested.load(Ordering::Acquire) {
            return Err(Error::cancelled());
        }
        Ok(())
    }
}
