//! System-wide constants for burrowdb.

// =============================================================================
// Page and Memory Constants
// =============================================================================

/// Default page size in bytes (4 KB).
///
/// Matches the typical OS page size; one page is the unit of both disk
/// I/O and buffer pool residency.
pub const DEFAULT_PAGE_SIZE: usize = 4 * 1024;

/// Minimum page size in bytes (4 KB).
pub const MIN_PAGE_SIZE: usize = 4 * 1024;

/// Maximum page size in bytes (64 KB).
pub const MAX_PAGE_SIZE: usize = 64 * 1024;

// =============================================================================
// Buffer Pool Constants
// =============================================================================

/// Default number of frames in the buffer pool.
pub const DEFAULT_POOL_SIZE: usize = 1024;

/// Minimum number of frames for a usable pool.
pub const MIN_POOL_SIZE: usize = 2;

// =============================================================================
// Hash Index Constants
// =============================================================================

/// Default number of entries per extendible hash bucket.
pub const DEFAULT_HASH_BUCKET_SIZE: usize = 64;
