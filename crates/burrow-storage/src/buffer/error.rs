//! Buffer pool errors.

use burrow_common::types::PageId;
use thiserror::Error;

use crate::disk::DiskError;

/// Result type for buffer pool operations.
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer pool operations.
///
/// Only genuine failures are errors. "Page not resident", "page still
/// pinned", and "pool exhausted" are ordinary outcomes reported through
/// the operation's return value, not through this enum.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum BufferError {
    /// Disk I/O failure, propagated from the disk manager verbatim.
    #[error("disk error: {0}")]
    Disk(#[from] DiskError),

    /// The operation was given an invalid page ID.
    #[error("invalid page ID: {page_id}")]
    InvalidPageId { page_id: PageId },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl BufferError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
