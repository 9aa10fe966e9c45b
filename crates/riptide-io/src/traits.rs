//! The storage file trait.

use std::path::PathBuf;

use riptide_error::{Result, RiptideError};
use riptide_types::Cx;

use crate::buffer::IoBuffer;

/// Basic metadata for an open file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// File size in bytes.
    pub size: u64,
    /// Preferred I/O granularity of the underlying device.
    pub block_size: u32,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: PathBuf,
    pub is_dir: bool,
}

/// A file handle opened against some storage backend.
///
/// All operations are positional; there is no seek cursor. Implementations
/// may suspend inside any operation (the substrate owns the yield points);
/// callers thread a [`Cx`] through so cancellation can be observed there.
///
/// Short reads are legal: `read_at` returns the number of bytes actually
/// read, and `read_bulk` returns a buffer sized to the bytes actually read.
pub trait StorageFile {
    /// Read up to `buf.len()` bytes starting at byte `offset`.
    ///
    /// Returns the number of bytes read; `0` means end-of-file.
    fn read_at(&mut self, cx: &Cx, buf: &mut [u8], offset: u64) -> Result<usize>;

    /// Write `buf` starting at byte `offset`. Returns the bytes written.
    fn write_at(&mut self, cx: &Cx, buf: &[u8], offset: u64) -> Result<usize>;

    /// Read `len` bytes starting at `offset` into a freshly allocated
    /// buffer.
    ///
    /// The returned buffer is truncated to the bytes actually read, so a
    /// read past end-of-file yields a shorter (possibly empty) buffer
    /// rather than an error.
    fn read_bulk(&mut self, cx: &Cx, offset: u64, len: usize) -> Result<IoBuffer> {
        let mut data = vec![0_u8; len];
        let n = self.read_at(cx, &mut data, offset)?;
        data.truncate(n);
        Ok(IoBuffer::from_vec(data))
    }

    /// Flush written data to stable storage.
    fn flush(&mut self, cx: &Cx) -> Result<()>;

    /// File metadata.
    fn stat(&self, cx: &Cx) -> Result<FileStat> {
        Ok(FileStat {
            size: self.size(cx)?,
            block_size: 4096,
        })
    }

    /// Truncate (or extend with zeros) to `size` bytes.
    fn truncate(&mut self, cx: &Cx, size: u64) -> Result<()>;

    /// Hint that `[offset, offset + len)` is no longer needed. Backends
    /// without hole-punching support may ignore this.
    fn discard(&mut self, _cx: &Cx, _offset: u64, _len: u64) -> Result<()> {
        Ok(())
    }

    /// Reserve backing storage for `[offset, offset + len)`.
    fn allocate(&mut self, _cx: &Cx, _offset: u64, _len: u64) -> Result<()> {
        Ok(())
    }

    /// Current file size in bytes.
    fn size(&self, cx: &Cx) -> Result<u64>;

    /// Close the file. After this call the handle must not be used.
    fn close(&mut self, cx: &Cx) -> Result<()>;

    /// Duplicate this handle. Both handles refer to the same underlying
    /// file.
    fn try_clone(&self, cx: &Cx) -> Result<Self>
    where
        Self: Sized;

    /// List the entries of this handle, when it names a directory.
    fn list_directory(&self, _cx: &Cx) -> Result<Vec<DirEntry>> {
        Err(RiptideError::Unsupported)
    }
}
