//! Disk manager errors.

use std::io;
use std::path::PathBuf;

use burrow_common::types::PageId;
use thiserror::Error;

/// Result type for disk operations.
pub type DiskResult<T> = Result<T, DiskError>;

/// Errors that can occur in a disk manager.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum DiskError {
    /// Standard I/O error.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Could not open or create the backing file.
    #[error("cannot open page file: {}", path.display())]
    Open { path: PathBuf, source: io::Error },

    /// Invalid page ID.
    #[error("invalid page ID: {page_id}")]
    InvalidPageId { page_id: PageId },

    /// Short write (less data written than a full page).
    #[error("short write for page {page_id}: expected {expected} bytes, wrote {actual}")]
    ShortWrite {
        page_id: PageId,
        expected: usize,
        actual: usize,
    },
}

impl DiskError {
    /// Creates an invalid page ID error.
    pub fn invalid_page(page_id: PageId) -> Self {
        Self::InvalidPageId { page_id }
    }

    /// Creates an open error with path context.
    pub fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }
}
