//! Metrics for query resolution
//!
//! Thread-safe counters for network calls, cache behaviour and the number
//! of requests in flight. `peak_in_flight` records the highest concurrency
//! ever observed, which must never exceed the configured ceiling.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Metrics collector shared by the executor and scheduler
#[derive(Debug, Default)]
pub struct Metrics {
    /// Network calls started
    pub network_calls: AtomicU64,
    /// Calls that produced a failed response (remote or transport)
    pub failed_calls: AtomicU64,
    /// Transport failures (timeouts, connection errors)
    pub transport_failures: AtomicU64,
    /// Lookups served from the cache
    pub cache_hits: AtomicU64,
    /// Lookups that required execution
    pub cache_misses: AtomicU64,
    /// Batches resolved
    pub batches_resolved: AtomicU64,
    /// Requests currently in flight
    pub in_flight: AtomicU64,
    /// Highest observed in-flight count
    pub peak_in_flight: AtomicU64,
    /// Cumulative network time in milliseconds
    pub network_time_ms: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a call entering flight
    pub fn record_call_started(&self) {
        self.network_calls.fetch_add(1, Ordering::Relaxed);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    /// Record a call leaving flight
    pub fn record_call_finished(&self, duration: Duration, success: bool, transport_failure: bool) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.network_time_ms.fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
        if !success {
            self.failed_calls.fetch_add(1, Ordering::Relaxed);
        }
        if transport_failure {
            self.transport_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch(&self) {
        self.batches_resolved.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            network_calls: self.network_calls.load(Ordering::Relaxed),
            failed_calls: self.failed_calls.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            batches_resolved: self.batches_resolved.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::SeqCst),
            peak_in_flight: self.peak_in_flight.load(Ordering::SeqCst),
            avg_call_ms: self.avg_call_time_ms(),
        }
    }

    /// Average network time per call in milliseconds
    pub fn avg_call_time_ms(&self) -> u64 {
        let total = self.network_time_ms.load(Ordering::Relaxed);
        let count = self.network_calls.load(Ordering::Relaxed);
        if count > 0 {
            total / count
        } else {
            0
        }
    }
}

/// Point-in-time copy of [`Metrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub network_calls: u64,
    pub failed_calls: u64,
    pub transport_failures: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub batches_resolved: u64,
    pub in_flight: u64,
    pub peak_in_flight: u64,
    pub avg_call_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_peak() {
        let metrics = Metrics::new();
        metrics.record_call_started();
        metrics.record_call_started();
        metrics.record_call_finished(Duration::from_millis(10), true, false);
        metrics.record_call_started();

        let snap = metrics.snapshot();
        assert_eq!(snap.network_calls, 3);
        assert_eq!(snap.in_flight, 2);
        assert_eq!(snap.peak_in_flight, 2);
    }

    #[test]
    fn test_failure_counters() {
        let metrics = Metrics::new();
        metrics.record_call_started();
        metrics.record_call_finished(Duration::from_millis(4), false, true);

        let snap = metrics.snapshot();
        assert_eq!(snap.failed_calls, 1);
        assert_eq!(snap.transport_failures, 1);
        assert_eq!(snap.in_flight, 0);
        assert_eq!(snap.avg_call_ms, 4);
    }

    #[test]
    fn test_cache_counters() {
        let metrics = Metrics::new();
        metrics.record_cache_hit();
        metrics.record_cache_miss();
        metrics.record_cache_miss();
        let snap = metrics.snapshot();
        assert_eq!(snap.cache_hits, 1);
        assert_eq!(snap.cache_misses, 2);
    }
}
