//! Buffer pool configuration.

use burrow_common::constants::{
    DEFAULT_HASH_BUCKET_SIZE, DEFAULT_PAGE_SIZE, DEFAULT_POOL_SIZE, MIN_PAGE_SIZE, MIN_POOL_SIZE,
};

/// Configuration for the buffer pool.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of page frames in the pool.
    pub pool_size: usize,
    /// Page size in bytes.
    pub page_size: usize,
    /// Entries per page-table hash bucket.
    pub bucket_size: usize,
}

impl BufferPoolConfig {
    /// Creates a configuration with the specified number of frames.
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool_size,
            page_size: DEFAULT_PAGE_SIZE,
            bucket_size: DEFAULT_HASH_BUCKET_SIZE,
        }
    }

    /// Creates a configuration from a memory budget in bytes.
    pub fn from_memory_size(memory_bytes: usize) -> Self {
        let pool_size = (memory_bytes / DEFAULT_PAGE_SIZE).max(MIN_POOL_SIZE);
        Self::new(pool_size)
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the page-table bucket size.
    pub fn with_bucket_size(mut self, bucket_size: usize) -> Self {
        self.bucket_size = bucket_size;
        self
    }

    /// Returns the total memory used by the frame array.
    pub fn memory_usage(&self) -> usize {
        self.pool_size * self.page_size
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.pool_size == 0 {
            return Err("pool_size must be > 0");
        }
        if !self.page_size.is_power_of_two() {
            return Err("page_size must be a power of 2");
        }
        if self.page_size < MIN_PAGE_SIZE {
            return Err("page_size must be >= 4096");
        }
        if self.bucket_size == 0 {
            return Err("bucket_size must be > 0");
        }
        Ok(())
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new() {
        let config = BufferPoolConfig::new(100);
        assert_eq!(config.pool_size, 100);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_memory() {
        let config = BufferPoolConfig::from_memory_size(64 * 1024 * 1024);
        assert_eq!(config.pool_size, 64 * 1024 * 1024 / DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_config_builder() {
        let config = BufferPoolConfig::new(100)
            .with_page_size(16384)
            .with_bucket_size(8);

        assert_eq!(config.page_size, 16384);
        assert_eq!(config.bucket_size, 8);
        assert_eq!(config.memory_usage(), 100 * 16384);
    }

    #[test]
    fn test_validation() {
        assert!(BufferPoolConfig::new(0).validate().is_err());
        assert!(BufferPoolConfig::new(10)
            .with_page_size(1000)
            .validate()
            .is_err());
        assert!(BufferPoolConfig::new(10)
            .with_bucket_size(0)
            .validate()
            .is_err());
    }
}
