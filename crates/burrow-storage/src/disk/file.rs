//! Single-file page store.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use burrow_common::types::PageId;
use parking_lot::Mutex;

use super::error::{DiskError, DiskResult};
use super::DiskManager;

/// A disk manager backed by a single file of fixed-size pages.
///
/// Page `n` occupies bytes `[n * page_size, (n + 1) * page_size)`.
/// Reads past the current end of file zero-fill the buffer: a page that
/// was allocated but never written reads as all zeroes. Page ids are
/// handed out monotonically; deallocation is bookkeeping only and never
/// truncates the file.
pub struct FileDiskManager {
    /// The backing file, serialized behind one lock.
    file: Mutex<File>,
    path: PathBuf,
    page_size: usize,
    /// Next page id to hand out.
    next_page_id: AtomicU64,
}

impl FileDiskManager {
    /// Opens (or creates) a page file.
    ///
    /// The next page id to allocate is derived from the current file
    /// length, so reopening an existing file continues its id sequence.
    pub fn open(path: impl AsRef<Path>, page_size: usize) -> DiskResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(|e| DiskError::open(&path, e))?;

        let len = file.metadata()?.len();
        let next_page_id = len.div_ceil(page_size as u64);

        Ok(Self {
            file: Mutex::new(file),
            path,
            page_size,
            next_page_id: AtomicU64::new(next_page_id),
        })
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the page size in bytes.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn offset_of(&self, page_id: PageId) -> u64 {
        page_id.as_u64() * self.page_size as u64
    }
}

impl DiskManager for FileDiskManager {
    fn allocate_page(&self) -> PageId {
        PageId::new(self.next_page_id.fetch_add(1, Ordering::AcqRel))
    }

    fn deallocate_page(&self, page_id: PageId) {
        // Bookkeeping only: the id is never reissued and the file keeps
        // its length. A free-space map is the natural extension point.
        tracing::trace!(page_id = %page_id, "deallocated page");
    }

    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> DiskResult<()> {
        if !page_id.is_valid() {
            return Err(DiskError::invalid_page(page_id));
        }

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(self.offset_of(page_id)))?;

        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        // Reads past EOF yield a zeroed tail.
        buf[filled..].fill(0);
        Ok(())
    }

    fn write_page(&self, page_id: PageId, data: &[u8]) -> DiskResult<()> {
        if !page_id.is_valid() {
            return Err(DiskError::invalid_page(page_id));
        }

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(self.offset_of(page_id)))?;
        file.write_all(data)?;
        file.sync_data()?;
        Ok(())
    }
}

impl std::fmt::Debug for FileDiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDiskManager")
            .field("path", &self.path)
            .field("page_size", &self.page_size)
            .field("next_page_id", &self.next_page_id.load(Ordering::Relaxed))
            .finish()
    }
}
