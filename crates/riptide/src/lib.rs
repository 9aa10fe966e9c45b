//! Public API facade for the Riptide read path.
//!
//! Re-exports the read-admission semaphore and the file substrate it
//! meters. Engine code should depend on this crate rather than on the
//! internal crates directly.

pub use riptide_admission::{
    make_tracked_file, Admission, InactiveRead, InactiveReadHandle, InactiveReadStats,
    MemoryUnits, ReadPermit, ReadSemaphore, SemaphoreConfig, TrackingFile,
};
pub use riptide_error::{Result, RiptideError};
pub use riptide_io::{DirEntry, FileStat, IoBuffer, MemoryFile, StorageFile};
#[cfg(unix)]
pub use riptide_io::UnixFile;
pub use riptide_types::{Clock, Cx, Resources, Timestamp};
