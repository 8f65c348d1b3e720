//! Mapper service metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters of one mapper service
#[derive(Debug, Default)]
pub struct MapperMetrics {
    /// Keyframe requests handled
    map_count: AtomicU64,
    /// Gap tracking requests handled
    gap_count: AtomicU64,
    /// Acknowledgements sent
    ack_count: AtomicU64,
    /// Backend failures
    failure_count: AtomicU64,
}

impl MapperMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map_count(&self) -> u64 {
        self.map_count.load(Ordering::Relaxed)
    }

    pub fn inc_map_count(&self) {
        self.map_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn gap_count(&self) -> u64 {
        self.gap_count.load(Ordering::Relaxed)
    }

    pub fn inc_gap_count(&self) {
        self.gap_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ack_count(&self) -> u64 {
        self.ack_count.load(Ordering::Relaxed)
    }

    /// Increment and return the new acknowledgement count
    pub fn next_ack(&self) -> u64 {
        self.ack_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            map_count: self.map_count(),
            gap_count: self.gap_count(),
            ack_count: self.ack_count(),
            failure_count: self.failure_count(),
        }
    }
}

/// Snapshot of mapper metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub map_count: u64,
    pub gap_count: u64,
    pub ack_count: u64,
    pub failure_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_sequence_starts_at_one() {
        let metrics = MapperMetrics::new();
        assert_eq!(metrics.next_ack(), 1);
        assert_eq!(metrics.next_ack(), 2);
        metrics.inc_gap_count();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.ack_count, 2);
        assert_eq!(snapshot.gap_count, 1);
        assert_eq!(snapshot.map_count, 0);
    }
}
