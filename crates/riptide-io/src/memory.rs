//! In-memory storage files.
//!
//! [`MemoryFile`] keeps its contents in a shared byte vector. Handles are
//! cheap to clone and duplicated handles (`try_clone`) alias the same
//! storage, matching the dup semantics of real file descriptors. Used by
//! tests and by cache-only shards that never touch disk.

use std::sync::{Arc, Mutex};

use riptide_error::{Result, RiptideError};
use riptide_types::Cx;

use crate::traits::StorageFile;

#[derive(Debug, Default)]
struct FileStorage {
    data: Vec<u8>,
}

fn lock_err() -> RiptideError {
    RiptideError::internal("MemoryFile lock poisoned")
}

/// A file whose contents live in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryFile {
    storage: Arc<Mutex<FileStorage>>,
}

impl MemoryFile {
    /// Create a new empty in-memory file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an in-memory file with initial contents.
    #[must_use]
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self {
            storage: Arc::new(Mutex::new(FileStorage { data: data.into() })),
        }
    }

    /// Snapshot the current contents.
    pub fn contents(&self) -> Result<Vec<u8>> {
        Ok(self.storage.lock().map_err(|_| lock_err())?.data.clone())
    }
}

impl StorageFile for MemoryFile {
    fn read_at(&mut self, _cx: &Cx, buf: &mut [u8], offset: u64) -> Result<usize> {
        let storage = self.storage.lock().map_err(|_| lock_err())?;
        let offset = usize::try_from(offset).map_err(|_| RiptideError::Unsupported)?;
        if offset >= storage.data.len() {
            return Ok(0);
        }
        let n = buf.len().min(storage.data.len() - offset);
        buf[..n].copy_from_slice(&storage.data[offset..offset + n]);
        Ok(n)
    }

    fn write_at(&mut self, _cx: &Cx, buf: &[u8], offset: u64) -> Result<usize> {
        let mut storage = self.storage.lock().map_err(|_| lock_err())?;
        let offset = usize::try_from(offset).map_err(|_| RiptideError::Unsupported)?;
        let end = offset + buf.len();
        if storage.data.len() < end {
            storage.data.resize(end, 0);
        }
        storage.data[offset..end].copy_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self, _cx: &Cx) -> Result<()> {
        Ok(())
    }

    fn truncate(&mut self, _cx: &Cx, size: u64) -> Result<()> {
        let mut storage = self.storage.lock().map_err(|_| lock_err())?;
        let size = usize::try_from(size).map_err(|_| RiptideError::Unsupported)?;
        storage.data.resize(size, 0);
        Ok(())
    }

    fn size(&self, _cx: &Cx) -> Result<u64> {
        let storage = self.storage.lock().map_err(|_| lock_err())?;
        Ok(storage.data.len() as u64)
    }

    fn close(&mut self, _cx: &Cx) -> Result<()> {
        Ok(())
    }

    fn try_clone(&self, _cx: &Cx) -> Result<Self> {
        Ok(self.clone())
    }
}
