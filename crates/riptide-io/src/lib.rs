//! File substrate for the Riptide read path.
//!
//! This crate abstracts positional file I/O behind the [`StorageFile`]
//! trait so the admission layer can wrap any backend: real files
//! ([`UnixFile`]), in-memory storage ([`MemoryFile`]), or custom
//! implementations.
//!
//! Bulk reads return an [`IoBuffer`], an owned byte buffer that can carry an
//! opaque guard dropped together with it — the hook the admission layer uses
//! to tie a memory charge to a buffer's lifetime.
//!
//! This is the only Riptide crate permitted to touch `std::fs`; everything
//! above it goes through [`StorageFile`].

pub mod buffer;
pub mod memory;
pub mod traits;
#[cfg(unix)]
pub mod unix;

pub use buffer::IoBuffer;
pub use memory::MemoryFile;
pub use traits::{DirEntry, FileStat, StorageFile};
#[cfg(unix)]
pub use unix::UnixFile;
