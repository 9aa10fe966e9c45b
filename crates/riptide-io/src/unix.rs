//! Unix storage files.
//!
//! Positional I/O over `std::fs::File` via `FileExt::read_at`/`write_at` —
//! no seek cursor, so duplicated handles never race on file position.
//! `flush` maps to `sync_all`; durability of directory entries is the
//! caller's concern.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::{FileExt, MetadataExt};
use std::path::{Path, PathBuf};

use tracing::debug;

use riptide_error::{Result, RiptideError};
use riptide_types::Cx;

use crate::traits::{DirEntry, StorageFile};

/// A file backed by the local Unix filesystem.
#[derive(Debug)]
pub struct UnixFile {
    file: File,
    path: PathBuf,
}

impl UnixFile {
    /// Open an existing file (or directory) for reading and writing.
    pub fn open(_cx: &Cx, path: &Path) -> Result<Self> {
        let is_dir = path.is_dir();
        let file = if is_dir {
            File::open(path)
        } else {
            OpenOptions::new().read(true).write(true).open(path)
        }
        .map_err(|_| RiptideError::CannotOpen {
            path: path.to_path_buf(),
        })?;
        debug!(path = %path.display(), "opened unix file");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Create (or truncate) a file for reading and writing.
    pub fn create(_cx: &Cx, path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|_| RiptideError::CannotOpen {
                path: path.to_path_buf(),
            })?;
        debug!(path = %path.display(), "created unix file");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// The path this handle was opened with.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageFile for UnixFile {
    fn read_at(&mut self, _cx: &Cx, buf: &mut [u8], offset: u64) -> Result<usize> {
        Ok(self.file.read_at(buf, offset)?)
    }

    fn write_at(&mut self, _cx: &Cx, buf: &[u8], offset: u64) -> Result<usize> {
        Ok(self.file.write_at(buf, offset)?)
    }

    fn flush(&mut self, _cx: &Cx) -> Result<()> {
        Ok(self.file.sync_all()?)
    }

    fn stat(&self, _cx: &Cx) -> Result<crate::traits::FileStat> {
        let meta = self.file.metadata()?;
        Ok(crate::traits::FileStat {
            size: meta.len(),
            block_size: u32::try_from(meta.blksize()).unwrap_or(4096),
        })
    }

    fn truncate(&mut self, _cx: &Cx, size: u64) -> Result<()> {
        Ok(self.file.set_len(size)?)
    }

    fn allocate(&mut self, _cx: &Cx, offset: u64, len: u64) -> Result<()> {
        // Growth-only reservation; a hole-punching backend would use
        // fallocate here.
        let end = offset.saturating_add(len);
        if end > self.file.metadata()?.len() {
            self.file.set_len(end)?;
        }
        Ok(())
    }

    fn size(&self, _cx: &Cx) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn close(&mut self, _cx: &Cx) -> Result<()> {
        // Dropping the handle closes the descriptor; sync first so close
        // is a durability point.
        Ok(self.file.sync_all()?)
    }

    fn try_clone(&self, _cx: &Cx) -> Result<Self> {
        Ok(Self {
            file: self.file.try_clone()?,
            path: self.path.clone(),
        })
    }

    fn list_directory(&self, _cx: &Cx) -> Result<Vec<DirEntry>> {
        if !self.file.metadata()?.is_dir() {
            return Err(RiptideError::Unsupported);
        }
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&self.path)? {
            let entry = entry?;
            entries.push(DirEntry {
                name: PathBuf::from(entry.file_name()),
                is_dir: entry.file_type()?.is_dir(),
            });
        }
        Ok(entries)
    }
}
