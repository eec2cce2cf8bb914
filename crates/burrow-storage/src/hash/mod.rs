//! Extendible hashing.
//!
//! The buffer pool uses an extendible hash table as its page table
//! (page id to frame id). The table grows by doubling a directory of
//! bucket references and splitting overflowing buckets; it never
//! shrinks.

mod extendible;

pub use extendible::ExtendibleHashTable;
