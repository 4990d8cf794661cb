use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Aggregated counters surfaced by `--stats`.
///
/// All fields are independently atomic; readers calling [`SessionStats::snapshot`]
/// may observe a result that is not perfectly consistent across fields under
/// concurrent updates, which is acceptable for a human-facing summary.
#[derive(Debug, Default)]
pub struct SessionStats {
    pub api_calls: AtomicU64,
    pub bytes_read: AtomicU64,
    pub bytes_written: AtomicU64,
    pub tasks_spawned: AtomicU64,
    pub retries: AtomicU64,
    pub audit_write_failures: AtomicU64,
    weighted_usage_total_millis: AtomicU64,
}

/// Point-in-time, plain-data view of [`SessionStats`] suitable for
/// serialization (`--stats` output, audit snapshots).
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct StatsSnapshot {
    pub api_calls: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub tasks_spawned: u64,
    pub retries: u64,
    pub audit_write_failures: u64,
    pub weighted_usage_total: f64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_api_call(&self) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bytes_read(&self, n: u64) {
        self.bytes_read.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_bytes_written(&self, n: u64) {
        self.bytes_written.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_task_spawned(&self) {
        self.tasks_spawned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_audit_failure(&self) {
        self.audit_write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Weighted units are accumulated as fixed-point millis so the counter
    /// can stay a plain atomic integer.
    pub fn record_weighted_usage(&self, weighted: f64) {
        let millis = (weighted * 1000.0).round() as u64;
        self.weighted_usage_total_millis
            .fetch_add(millis, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            api_calls: self.api_calls.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            tasks_spawned: self.tasks_spawned.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            audit_write_failures: self.audit_write_failures.load(Ordering::Relaxed),
            weighted_usage_total: self.weighted_usage_total_millis.load(Ordering::Relaxed) as f64
                / 1000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_counters() {
        let stats = SessionStats::new();
        stats.record_api_call();
        stats.record_api_call();
        stats.record_bytes_read(100);
        stats.record_bytes_written(42);
        stats.record_task_spawned();
        stats.record_retry();
        stats.record_audit_failure();
        stats.record_weighted_usage(12.5);
        stats.record_weighted_usage(0.25);

        let snap = stats.snapshot();
        assert_eq!(snap.api_calls, 2);
        assert_eq!(snap.bytes_read, 100);
        assert_eq!(snap.bytes_written, 42);
        assert_eq!(snap.tasks_spawned, 1);
        assert_eq!(snap.retries, 1);
        assert_eq!(snap.audit_write_failures, 1);
        assert_eq!(snap.weighted_usage_total, 12.75);
    }

    #[test]
    fn default_snapshot_is_zero() {
        let stats = SessionStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }
}
