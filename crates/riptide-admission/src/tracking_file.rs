//! A file that tracks the memory usage of buffers produced by bulk reads.
//!
//! The memory estimate supplied at admission covers only the initial cost
//! of a read; the true size of an I/O buffer is known only once the read
//! completes. [`TrackingFile`] closes that gap: it charges the permit's
//! semaphore for each bulk read and ties the charge to the returned
//! buffer's lifetime, so the budget is credited the moment the consumer
//! releases the bytes.

use riptide_error::Result;
use riptide_io::{DirEntry, FileStat, IoBuffer, StorageFile};
use riptide_types::Cx;

use crate::permit::ReadPermit;

/// Delegating [`StorageFile`] wrapper that meters bulk reads against a
/// [`ReadPermit`]'s semaphore.
///
/// Every operation forwards to the wrapped file; only [`read_bulk`]
/// (`StorageFile::read_bulk`) is instrumented. With a null permit the
/// wrapper is a transparent pass-through.
#[derive(Debug)]
pub struct TrackingFile<F> {
    file: F,
    permit: ReadPermit,
}

/// Wrap `file` so its bulk-read buffers are charged against `permit`.
pub fn make_tracked_file<F: StorageFile>(file: F, permit: ReadPermit) -> TrackingFile<F> {
    TrackingFile { file, permit }
}

impl<F> TrackingFile<F> {
    /// Unwrap, discarding the permit binding.
    pub fn into_inner(self) -> F {
        self.file
    }
}

impl<F: StorageFile> StorageFile for TrackingFile<F> {
    fn read_at(&mut self, cx: &Cx, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.file.read_at(cx, buf, offset)
    }

    fn write_at(&mut self, cx: &Cx, buf: &[u8], offset: u64) -> Result<usize> {
        self.file.write_at(cx, buf, offset)
    }

    fn read_bulk(&mut self, cx: &Cx, offset: u64, len: usize) -> Result<IoBuffer> {
        // Charge the estimate up front; the pool sees the pressure for the
        // whole duration of the read.
        let mut units = self.permit.get_memory_units(len as u64);
        let buf = self.file.read_bulk(cx, offset, len)?;
        if self.permit.is_tracked() {
            // The real cost is the bytes actually returned (short reads
            // shed the excess). The charge now lives exactly as long as
            // the buffer.
            units.reset(buf.len() as u64);
            Ok(buf.with_guard(units))
        } else {
            Ok(buf)
        }
    }

    fn flush(&mut self, cx: &Cx) -> Result<()> {
        self.file.flush(cx)
    }

    fn stat(&self, cx: &Cx) -> Result<FileStat> {
        self.file.stat(cx)
    }

    fn truncate(&mut self, cx: &Cx, size: u64) -> Result<()> {
        self.file.truncate(cx, size)
    }

    fn discard(&mut self, cx: &Cx, offset: u64, len: u64) -> Result<()> {
        self.file.discard(cx, offset, len)
    }

    fn allocate(&mut self, cx: &Cx, offset: u64, len: u64) -> Result<()> {
        self.file.allocate(cx, offset, len)
    }

    fn size(&self, cx: &Cx) -> Result<u64> {
        self.file.size(cx)
    }

    fn close(&mut self, cx: &Cx) -> Result<()> {
        self.file.close(cx)
    }

    fn try_clone(&self, cx: &Cx) -> Result<Self> {
        Ok(Self {
            file: self.file.try_clone(cx)?,
            permit: self.permit.clone(),
        })
    }

    fn list_directory(&self, cx: &Cx) -> Result<Vec<DirEntry>> {
        self.file.list_directory(cx)
    }
}
