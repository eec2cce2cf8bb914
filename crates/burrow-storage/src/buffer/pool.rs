//! Buffer pool manager.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use burrow_common::types::{Lsn, PageId};
use parking_lot::Mutex;

use super::config::BufferPoolConfig;
use super::error::{BufferError, BufferResult};
use super::frame::{Frame, FrameId};
use super::replacer::LruReplacer;
use super::BufferPoolStats;
use crate::disk::DiskManager;
use crate::hash::ExtendibleHashTable;
use crate::wal::LogManager;

/// State owned exclusively by the manager lock.
///
/// Every public operation serializes on this lock; the sequence
/// (victim selection, dirty write-back, page-table rebind, read-in,
/// return pinned) is therefore atomic against other pool operations.
/// Disk I/O runs under the lock.
struct PoolState {
    /// Frames holding no page, in FIFO order.
    free_list: VecDeque<FrameId>,
}

/// The buffer pool manager.
///
/// Owns the frame array and coordinates the page table, the replacer,
/// the free list, and the disk manager. Callers obtain pinned frames
/// with [`fetch_page`](Self::fetch_page) or
/// [`new_page`](Self::new_page) and release them with
/// [`unpin_page`](Self::unpin_page); a frame's data must not be touched
/// after unpinning it.
///
/// Pool exhaustion (every frame pinned) is reported as `Ok(None)`, not
/// as an error; disk failures propagate verbatim and are never retried.
pub struct BufferPoolManager {
    config: BufferPoolConfig,
    /// All frames, allocated once at startup.
    frames: Vec<Arc<Frame>>,
    /// Page table: maps PageId -> FrameId.
    page_table: ExtendibleHashTable<PageId, FrameId>,
    /// Unpinned resident frames in access order.
    replacer: LruReplacer<FrameId>,
    /// Manager lock and the free list it protects.
    state: Mutex<PoolState>,
    /// The on-disk page store.
    disk: Arc<dyn DiskManager>,
    /// Optional WAL coupling; `None` disables it.
    log: Option<Arc<dyn LogManager>>,
    /// Fetch counter for statistics.
    fetch_count: AtomicU64,
    /// Hit counter for statistics.
    hit_count: AtomicU64,
    /// Miss counter for statistics.
    miss_count: AtomicU64,
    /// Eviction counter for statistics.
    eviction_count: AtomicU64,
    /// Write-back counter for statistics.
    flush_count: AtomicU64,
}

impl BufferPoolManager {
    /// Creates a buffer pool with the given configuration.
    pub fn new(
        config: BufferPoolConfig,
        disk: Arc<dyn DiskManager>,
        log: Option<Arc<dyn LogManager>>,
    ) -> BufferResult<Self> {
        config.validate().map_err(BufferError::config)?;

        let frames: Vec<Arc<Frame>> = (0..config.pool_size)
            .map(|i| Arc::new(Frame::new(FrameId::new(i), config.page_size)))
            .collect();
        let free_list: VecDeque<FrameId> = (0..config.pool_size).map(FrameId::new).collect();

        Ok(Self {
            page_table: ExtendibleHashTable::new(config.bucket_size),
            replacer: LruReplacer::new(),
            state: Mutex::new(PoolState { free_list }),
            frames,
            config,
            disk,
            log,
            fetch_count: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            eviction_count: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
        })
    }

    /// Fetches a page, pinning it.
    ///
    /// On a hit the resident frame is pinned and withdrawn from the
    /// replacer. On a miss a victim frame is reclaimed (free list
    /// first, then LRU), written back if dirty, rebound, and filled
    /// from disk. Returns `Ok(None)` when every frame is pinned.
    pub fn fetch_page(&self, page_id: PageId) -> BufferResult<Option<Arc<Frame>>> {
        if !page_id.is_valid() {
            return Err(BufferError::InvalidPageId { page_id });
        }

        let mut state = self.state.lock();
        self.fetch_count.fetch_add(1, Ordering::Relaxed);

        if let Some(frame_id) = self.page_table.find(&page_id) {
            let frame = &self.frames[frame_id.index()];
            frame.pin();
            // If another pin was already outstanding the frame was not
            // in the replacer; erase is a no-op then.
            self.replacer.erase(&frame_id);
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            return Ok(Some(Arc::clone(frame)));
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);
        let Some(frame_id) = self.take_victim(&mut state) else {
            return Ok(None);
        };
        let frame = Arc::clone(&self.frames[frame_id.index()]);

        self.write_back_if_dirty(&frame)?;

        // Rebind: the victim's old mapping disappears (no-op when the
        // frame came unbound off the free list).
        self.page_table.remove(&frame.page_id());
        self.page_table.insert(page_id, frame_id);

        {
            let mut data = frame.write_data();
            self.disk.read_page(page_id, &mut data[..])?;
        }
        frame.set_page_id(page_id);
        frame.set_dirty(false);
        frame.set_lsn(Lsn::INVALID);
        frame.pin();

        Ok(Some(frame))
    }

    /// Unpins a page, optionally reporting it dirtied.
    ///
    /// The dirty flag is sticky within a residency: once any caller
    /// reports the page dirty it stays dirty until written back.
    /// Returns `false` when the page is not resident or its pin count
    /// is already zero.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let _state = self.state.lock();
        let Some(frame_id) = self.page_table.find(&page_id) else {
            return false;
        };
        let frame = &self.frames[frame_id.index()];

        if is_dirty {
            frame.set_dirty(true);
        }
        if frame.pin_count() == 0 {
            tracing::warn!(page_id = %page_id, "unpin of page with zero pin count");
            return false;
        }
        if frame.unpin() == 0 {
            self.replacer.insert(frame_id);
        }
        true
    }

    /// Writes a resident page through to disk if it is dirty.
    ///
    /// Returns `Ok(false)` when the page is not resident. Pin count and
    /// replacer membership are unchanged; flushing a clean page is a
    /// no-op.
    pub fn flush_page(&self, page_id: PageId) -> BufferResult<bool> {
        let _state = self.state.lock();
        if !page_id.is_valid() {
            return Ok(false);
        }
        let Some(frame_id) = self.page_table.find(&page_id) else {
            return Ok(false);
        };
        self.write_back_if_dirty(&self.frames[frame_id.index()])?;
        Ok(true)
    }

    /// Writes every dirty resident page through to disk.
    ///
    /// Returns the number of pages written.
    pub fn flush_all_pages(&self) -> BufferResult<usize> {
        let _state = self.state.lock();
        let mut flushed = 0;
        for frame in &self.frames {
            if !frame.is_unbound() && frame.is_dirty() {
                self.write_back_if_dirty(frame)?;
                flushed += 1;
            }
        }
        Ok(flushed)
    }

    /// Allocates a new page and returns it pinned, with zeroed data.
    ///
    /// Returns `Ok(None)` when every frame is pinned. The frame carries
    /// the freshly allocated page id.
    pub fn new_page(&self) -> BufferResult<Option<Arc<Frame>>> {
        let mut state = self.state.lock();
        let Some(frame_id) = self.take_victim(&mut state) else {
            return Ok(None);
        };
        let frame = Arc::clone(&self.frames[frame_id.index()]);

        let page_id = self.disk.allocate_page();
        self.write_back_if_dirty(&frame)?;

        self.page_table.remove(&frame.page_id());
        self.page_table.insert(page_id, frame_id);

        frame.set_page_id(page_id);
        frame.zero_data();
        frame.set_dirty(false);
        frame.set_lsn(Lsn::INVALID);
        frame.pin();

        tracing::trace!(page_id = %page_id, frame_id = frame_id.index(), "allocated new page");
        Ok(Some(frame))
    }

    /// Deletes a page, returning its frame to the free list.
    ///
    /// Returns `false` when the page is resident and still pinned. The
    /// disk manager's deallocation is invoked whether or not the page
    /// was resident.
    pub fn delete_page(&self, page_id: PageId) -> bool {
        let mut state = self.state.lock();
        if let Some(frame_id) = self.page_table.find(&page_id) {
            let frame = &self.frames[frame_id.index()];
            if frame.pin_count() > 0 {
                return false;
            }
            self.replacer.erase(&frame_id);
            self.page_table.remove(&page_id);
            frame.zero_data();
            frame.reset();
            state.free_list.push_back(frame_id);
        }
        self.disk.deallocate_page(page_id);
        true
    }

    /// Returns true if a page is resident.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.page_table.contains(&page_id)
    }

    /// Returns the number of frames in the pool.
    pub fn num_frames(&self) -> usize {
        self.config.pool_size
    }

    /// Returns the page size in bytes.
    pub fn page_size(&self) -> usize {
        self.config.page_size
    }

    /// Returns statistics about the buffer pool.
    pub fn stats(&self) -> BufferPoolStats {
        let mut pinned = 0;
        let mut dirty = 0;
        for frame in &self.frames {
            if frame.is_pinned() {
                pinned += 1;
            }
            if frame.is_dirty() {
                dirty += 1;
            }
        }

        BufferPoolStats {
            fetches: self.fetch_count.load(Ordering::Relaxed),
            hits: self.hit_count.load(Ordering::Relaxed),
            misses: self.miss_count.load(Ordering::Relaxed),
            evictions: self.eviction_count.load(Ordering::Relaxed),
            flushes: self.flush_count.load(Ordering::Relaxed),
            pinned_frames: pinned,
            dirty_frames: dirty,
        }
    }

    // -------------------------------------------------------------------------
    // Private helpers
    // -------------------------------------------------------------------------

    /// Reclaims a frame for a fresh page.
    ///
    /// Policy: pop the free list first; fall back to the replacer.
    /// Returns `None` when the pool is fully pinned.
    fn take_victim(&self, state: &mut PoolState) -> Option<FrameId> {
        if let Some(frame_id) = state.free_list.pop_front() {
            debug_assert!(self.frames[frame_id.index()].is_unbound());
            debug_assert_eq!(self.frames[frame_id.index()].pin_count(), 0);
            return Some(frame_id);
        }

        let frame_id = self.replacer.victim()?;
        debug_assert_eq!(self.frames[frame_id.index()].pin_count(), 0);
        self.eviction_count.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(
            frame_id = frame_id.index(),
            page_id = %self.frames[frame_id.index()].page_id(),
            "evicting frame"
        );
        Some(frame_id)
    }

    /// Writes a frame back to disk if it is dirty, honoring the
    /// write-ahead rule when a log manager is attached.
    fn write_back_if_dirty(&self, frame: &Frame) -> BufferResult<()> {
        if frame.is_dirty() {
            if let Some(log) = &self.log {
                let lsn = frame.lsn();
                if lsn.is_valid() {
                    log.flush_to_lsn(lsn);
                }
            }
            {
                let data = frame.read_data();
                self.disk.write_page(frame.page_id(), &data[..])?;
            }
            frame.set_dirty(false);
            self.flush_count.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(page_id = %frame.page_id(), "wrote back dirty page");
        }
        Ok(())
    }
}

impl std::fmt::Debug for BufferPoolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPoolManager")
            .field("pool_size", &self.config.pool_size)
            .field("page_size", &self.config.page_size)
            .field("stats", &self.stats())
            .finish()
    }
}
