//! High-water mark of pool usage.
//!
//! Kept cheap: one relaxed load on the fast path, a CAS loop only when a
//! new peak is seen.

use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Debug, Default)]
pub struct PeakTracker {
    peak_bytes: AtomicI64,
}

impl PeakTracker {
    pub fn new() -> Self {
        Self {
            peak_bytes: AtomicI64::new(0),
        }
    }

    /// Record a new "used bytes" value; updates peak if higher.
    pub fn record_used(&self, used_bytes: i64) {
        let mut cur = self.peak_bytes.load(Ordering::Relaxed);
        while used_bytes > cur {
            match self.peak_bytes.compare_exchange(
                cur,
                used_bytes,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(used_bytes, previous = cur, "new pool usage peak");
                    break;
                }
                Err(observed) => cur = observed,
            }
        }
    }

    pub fn peak(&self) -> i64 {
        self.peak_bytes.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_only_moves_up() {
        let t = PeakTracker::new();
        t.record_used(10);
        t.record_used(4);
        assert_eq!(t.peak(), 10);
        t.record_used(25);
        assert_eq!(t.peak(), 25);
        t.record_used(-3);
        assert_eq!(t.peak(), 25);
    }
}
