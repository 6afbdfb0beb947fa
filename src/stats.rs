//! Statistics tracking for the forwarder.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters describing handled datagrams.
pub struct Stats {
    pub requests: AtomicU64,
    pub answered: AtomicU64,
    pub dropped: AtomicU64,
    pub not_implemented: AtomicU64,
    pub upstream_failures: AtomicU64,
    pub answers: AtomicU64,
    /// Cumulative response time in microseconds for averaging.
    total_response_time_us: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            answered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            not_implemented: AtomicU64::new(0),
            upstream_failures: AtomicU64::new(0),
            answers: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
        }
    }

    /// A reply was built. `answers` records made it in, `failures` questions
    /// contributed nothing because their forward failed.
    pub fn record_answered(&self, answers: usize, failures: usize, response_time_ms: f64) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.answered.fetch_add(1, Ordering::Relaxed);
        self.answers.fetch_add(answers as u64, Ordering::Relaxed);
        self.upstream_failures
            .fetch_add(failures as u64, Ordering::Relaxed);
        self.total_response_time_us
            .fetch_add((response_time_ms * 1000.0) as u64, Ordering::Relaxed);
    }

    pub fn record_not_implemented(&self, response_time_ms: f64) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.not_implemented.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us
            .fetch_add((response_time_ms * 1000.0) as u64, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot_and_reset(&self) -> StatsSnapshot {
        let requests = self.requests.swap(0, Ordering::Relaxed);
        let answered = self.answered.swap(0, Ordering::Relaxed);
        let dropped = self.dropped.swap(0, Ordering::Relaxed);
        let not_implemented = self.not_implemented.swap(0, Ordering::Relaxed);
        let upstream_failures = self.upstream_failures.swap(0, Ordering::Relaxed);
        let answers = self.answers.swap(0, Ordering::Relaxed);
        let total_us = self.total_response_time_us.swap(0, Ordering::Relaxed);

        let replied = answered + not_implemented;
        let avg_response_ms = if replied > 0 {
            (total_us as f64 / replied as f64) / 1000.0
        } else {
            0.0
        };

        StatsSnapshot {
            requests,
            answered,
            dropped,
            not_implemented,
            upstream_failures,
            answers,
            avg_response_ms,
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub answered: u64,
    pub dropped: u64,
    pub not_implemented: u64,
    pub upstream_failures: u64,
    pub answers: u64,
    pub avg_response_ms: f64,
}
