//! # burrow-common
//!
//! Common types and constants for burrowdb.
//!
//! This crate provides the foundational types shared across all burrowdb
//! components:
//!
//! - **Types**: Core identifiers (`PageId`, `Lsn`)
//! - **Constants**: System-wide constants and limits
//!
//! ## Example
//!
//! ```rust
//! use burrow_common::types::PageId;
//!
//! let page_id = PageId::new(42);
//! assert!(page_id.is_valid());
//! assert!(!PageId::INVALID.is_valid());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use types::{Lsn, PageId};
