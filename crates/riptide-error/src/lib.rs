//! Error types for the Riptide read path.
//!
//! One structured enum for the whole workspace. Admission errors carry the
//! semaphore's configured name so a multi-semaphore engine can tell which
//! pool rejected the read. I/O variants cover the file substrate.
//!
//! Slot-count underflow is deliberately **not** representable here: it is a
//! programming error in resource accounting and the admission crate panics
//! on it rather than surfacing a recoverable error.

use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for Riptide operations.
#[derive(Error, Debug)]
pub enum RiptideError {
    // === Admission ===
    /// The admission queue is at its configured length cap.
    #[error("{semaphore}: read admission queue overload")]
    QueueOverload { semaphore: String },

    /// A queued admission's deadline expired before resources freed up.
    #[error("{semaphore}: read admission timed out")]
    AdmissionTimeout { semaphore: String },

    /// Cancellation was observed while waiting for admission.
    #[error("operation cancelled")]
    Cancelled,

    // === I/O substrate ===
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fewer bytes than expected.
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    /// File could not be opened.
    #[error("cannot open file: '{path}'")]
    CannotOpen { path: PathBuf },

    /// Operation not supported by this file substrate.
    #[error("operation not supported")]
    Unsupported,

    /// Internal error (a bug).
    #[error("internal error: {0}")]
    Internal(String),
}

impl RiptideError {
    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this is a transient condition that may succeed on retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::QueueOverload { .. } | Self::AdmissionTimeout { .. }
        )
    }
}

/// Result type alias using `RiptideError`.
pub type Result<T> = std::result::Result<T, RiptideError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_overload() {
        let err = RiptideError::QueueOverload {
            semaphore: "user-reads".to_owned(),
        };
        assert_eq!(err.to_string(), "user-reads: read admission queue overload");
    }

    #[test]
    fn error_display_timeout() {
        let err = RiptideError::AdmissionTimeout {
            semaphore: "streaming".to_owned(),
        };
        assert_eq!(err.to_string(), "streaming: read admission timed out");
    }

    #[test]
    fn error_display_short_read() {
        let err = RiptideError::ShortRead {
            expected: 4096,
            actual: 512,
        };
        assert_eq!(err.to_string(), "short read: expected 4096 bytes, got 512");
    }

    #[test]
    fn transient_classification() {
        assert!(RiptideError::QueueOverload {
            semaphore: "s".to_owned()
        }
        .is_transient());
        assert!(RiptideError::AdmissionTimeout {
            semaphore: "s".to_owned()
        }
        .is_transient());
        assert!(!RiptideError::Cancelled.is_transient());
        assert!(!RiptideError::internal("bug").is_transient());
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: RiptideError = io.into();
        assert!(matches!(err, RiptideError::Io(_)));
    }
}
