//! In-memory page store for tests and benchmarks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use burrow_common::types::PageId;
use parking_lot::RwLock;

use super::error::DiskResult;
use super::DiskManager;

/// I/O statistics for an in-memory disk manager.
///
/// Tests use these counters to assert buffer pool behavior, e.g. that a
/// fetch hit performed no page read.
#[derive(Debug, Default)]
pub struct DiskStats {
    reads: AtomicU64,
    writes: AtomicU64,
    allocations: AtomicU64,
    deallocations: AtomicU64,
}

impl DiskStats {
    /// Returns the number of page reads.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Returns the number of page writes.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Returns the number of page allocations.
    pub fn allocations(&self) -> u64 {
        self.allocations.load(Ordering::Relaxed)
    }

    /// Returns the number of page deallocations.
    pub fn deallocations(&self) -> u64 {
        self.deallocations.load(Ordering::Relaxed)
    }
}

impl Clone for DiskStats {
    fn clone(&self) -> Self {
        Self {
            reads: AtomicU64::new(self.reads()),
            writes: AtomicU64::new(self.writes()),
            allocations: AtomicU64::new(self.allocations()),
            deallocations: AtomicU64::new(self.deallocations()),
        }
    }
}

/// A disk manager that keeps all pages in memory.
///
/// Unwritten pages read as zeroes, matching the file-backed store.
#[derive(Debug)]
pub struct MemDiskManager {
    pages: RwLock<HashMap<PageId, Vec<u8>>>,
    page_size: usize,
    next_page_id: AtomicU64,
    stats: DiskStats,
}

impl MemDiskManager {
    /// Creates an empty in-memory store.
    pub fn new(page_size: usize) -> Self {
        Self {
            pages: RwLock::new(HashMap::new()),
            page_size,
            next_page_id: AtomicU64::new(0),
            stats: DiskStats::default(),
        }
    }

    /// Returns the page size in bytes.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the I/O counters.
    pub fn stats(&self) -> &DiskStats {
        &self.stats
    }

    /// Returns the stored contents of a page, if it was ever written.
    ///
    /// Does not count as a read.
    pub fn page_contents(&self, page_id: PageId) -> Option<Vec<u8>> {
        self.pages.read().get(&page_id).cloned()
    }
}

impl DiskManager for MemDiskManager {
    fn allocate_page(&self) -> PageId {
        self.stats.allocations.fetch_add(1, Ordering::Relaxed);
        PageId::new(self.next_page_id.fetch_add(1, Ordering::AcqRel))
    }

    fn deallocate_page(&self, page_id: PageId) {
        self.stats.deallocations.fetch_add(1, Ordering::Relaxed);
        self.pages.write().remove(&page_id);
    }

    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> DiskResult<()> {
        self.stats.reads.fetch_add(1, Ordering::Relaxed);
        match self.pages.read().get(&page_id) {
            Some(data) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                buf[n..].fill(0);
            }
            None => buf.fill(0),
        }
        Ok(())
    }

    fn write_page(&self, page_id: PageId, data: &[u8]) -> DiskResult<()> {
        self.stats.writes.fetch_add(1, Ordering::Relaxed);
        self.pages.write().insert(page_id, data.to_vec());
        Ok(())
    }
}
