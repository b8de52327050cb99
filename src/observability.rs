use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Counters for one notification sync engine
#[derive(Debug, Default)]
pub struct SyncMetrics {
    pub events_processed: AtomicU64,
    pub events_ignored: AtomicU64,
    pub decode_fallbacks: AtomicU64,
    pub decode_failures: AtomicU64,
    pub refetches: AtomicU64,
    pub resubscribes: AtomicU64,
    pub toasts: AtomicU64,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_processed(&self) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ignored(&self) {
        self.events_ignored.fetch_add(1, Ordering::Relaxed);
    }

    /// One count per field that fell back to its default
    pub fn record_fallbacks(&self, fields: usize) {
        self.decode_fallbacks.fetch_add(fields as u64, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refetch(&self) {
        self.refetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_resubscribe(&self) {
        self.resubscribes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_toast(&self) {
        self.toasts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> SyncStats {
        SyncStats {
            events_processed: self.events_processed.load(Ordering::Relaxed),
            events_ignored: self.events_ignored.load(Ordering::Relaxed),
            decode_fallbacks: self.decode_fallbacks.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            refetches: self.refetches.load(Ordering::Relaxed),
            resubscribes: self.resubscribes.load(Ordering::Relaxed),
            toasts: self.toasts.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            events = stats.events_processed,
            ignored = stats.events_ignored,
            fallbacks = stats.decode_fallbacks,
            decode_failures = stats.decode_failures,
            refetches = stats.refetches,
            resubscribes = stats.resubscribes,
            toasts = stats.toasts,
            "Notification sync metrics"
        );
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub events_processed: u64,
    pub events_ignored: u64,
    pub decode_fallbacks: u64,
    pub decode_failures: u64,
    pub refetches: u64,
    pub resubscribes: u64,
    pub toasts: u64,
}

/// Time an operation and log its duration when finished
pub struct OperationTimer {
    operation: &'static str,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }

    pub fn finish(self, succeeded: bool) {
        let duration = self.start.elapsed();
        info!(
            operation = self.operation,
            duration_ms = duration.as_millis() as u64,
            succeeded,
            "Operation completed"
        );
    }
}
