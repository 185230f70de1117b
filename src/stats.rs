//! Statistics tracking for DNS proxy.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::transport::Classification;

/// Atomic per-classification counters.
#[derive(Debug, Default)]
pub struct Stats {
    forwarded: AtomicU64,
    answered: AtomicU64,
    format_errors: AtomicU64,
    not_implemented: AtomicU64,
    blacklisted: AtomicU64,
    /// Upstream answers with no matching pending query.
    dropped: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, classification: Classification) {
        let counter = match classification {
            Classification::Forwarded => &self.forwarded,
            Classification::Answer => &self.answered,
            Classification::FormatError => &self.format_errors,
            Classification::NotImplemented => &self.not_implemented,
            Classification::Blacklisted => &self.blacklisted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot_and_reset(&self) -> StatsSnapshot {
        StatsSnapshot {
            forwarded: self.forwarded.swap(0, Ordering::Relaxed),
            answered: self.answered.swap(0, Ordering::Relaxed),
            format_errors: self.format_errors.swap(0, Ordering::Relaxed),
            not_implemented: self.not_implemented.swap(0, Ordering::Relaxed),
            blacklisted: self.blacklisted.swap(0, Ordering::Relaxed),
            dropped: self.dropped.swap(0, Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub forwarded: u64,
    pub answered: u64,
    pub format_errors: u64,
    pub not_implemented: u64,
    pub blacklisted: u64,
    pub dropped: u64,
}

impl StatsSnapshot {
    /// Client queries seen, whatever their outcome.
    pub fn queries(&self) -> u64 {
        self.forwarded + self.format_errors + self.not_implemented + self.blacklisted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_counts_each_classification() {
        let stats = Stats::new();
        stats.record(Classification::Forwarded);
        stats.record(Classification::Forwarded);
        stats.record(Classification::Blacklisted);
        stats.record(Classification::FormatError);
        stats.record(Classification::Answer);
        stats.record_dropped();

        let snapshot = stats.snapshot_and_reset();

        assert_eq!(snapshot.forwarded, 2);
        assert_eq!(snapshot.blacklisted, 1);
        assert_eq!(snapshot.format_errors, 1);
        assert_eq!(snapshot.not_implemented, 0);
        assert_eq!(snapshot.answered, 1);
        assert_eq!(snapshot.dropped, 1);
        assert_eq!(snapshot.queries(), 4);
    }

    #[test]
    fn snapshot_resets_counters() {
        let stats = Stats::new();
        stats.record(Classification::NotImplemented);
        stats.snapshot_and_reset();

        assert_eq!(stats.snapshot_and_reset(), StatsSnapshot::default());
    }
}
