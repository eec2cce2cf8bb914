//! Write-ahead log coupling for the buffer pool.
//!
//! The buffer pool does not own a WAL; it only honors the write-ahead
//! rule when a log manager is attached: before a dirty frame is written
//! back, the log must be durable up to the frame's last-modified LSN.
//! Constructing the pool without a log manager disables the coupling.

use burrow_common::types::Lsn;

/// The log-manager interface consumed by the buffer pool.
pub trait LogManager: Send + Sync {
    /// Returns the LSN of the most recently appended record.
    fn current_lsn(&self) -> Lsn;

    /// Blocks until the log is durable up to (and including) `lsn`.
    fn flush_to_lsn(&self, lsn: Lsn);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct RecordingLog {
        lsn: AtomicU64,
        flushed: AtomicU64,
    }

    impl LogManager for RecordingLog {
        fn current_lsn(&self) -> Lsn {
            Lsn::new(self.lsn.load(Ordering::Acquire))
        }

        fn flush_to_lsn(&self, lsn: Lsn) {
            self.flushed.store(lsn.as_u64(), Ordering::Release);
        }
    }

    #[test]
    fn test_trait_object() {
        let log = RecordingLog {
            lsn: AtomicU64::new(10),
            flushed: AtomicU64::new(0),
        };
        let log: &dyn LogManager = &log;

        assert_eq!(log.current_lsn(), Lsn::new(10));
        log.flush_to_lsn(Lsn::new(10));
    }
}
