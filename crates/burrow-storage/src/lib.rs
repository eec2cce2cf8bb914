//! # burrow-storage
//!
//! The buffer pool core of burrowdb: a fixed pool of in-memory page
//! frames mediating access to an on-disk page store.
//!
//! The crate is built from three tightly coupled components:
//!
//! - [`buffer::BufferPoolManager`] — frame lifecycle, pin counts, dirty
//!   write-back, and page allocation against a disk manager
//! - [`hash::ExtendibleHashTable`] — the page table: page id to frame
//!   lookup with directory doubling and bucket splitting
//! - [`buffer::LruReplacer`] — the set of currently evictable frames in
//!   access order

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Buffer pool manager, frames, and replacement policy
pub mod buffer;

/// Disk manager interface and implementations
pub mod disk;

/// Extendible hashing
pub mod hash;

/// Write-ahead log coupling
pub mod wal;
