//! Live counters shared by every task of one run

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated from the fetcher and coordinator while a run is active
#[derive(Debug, Default)]
pub struct RunCounters {
    requests: AtomicU64,
    retries: AtomicU64,
    non_success: AtomicU64,
    detail_fetches: AtomicU64,
}

/// A point-in-time copy of [`RunCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// HTTP requests actually sent (every attempt counts)
    pub requests: u64,
    /// Attempts that were followed by a backoff and another attempt
    pub retries: u64,
    /// Responses with a non-2xx status
    pub non_success: u64,
    /// Unique detail references for which at least one request was sent
    pub detail_fetches: u64,
}

impl RunCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_non_success(&self) {
        self.non_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_detail_fetch(&self) {
        self.detail_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            non_success: self.non_success.load(Ordering::Relaxed),
            detail_fetches: self.detail_fetches.load(Ordering::Relaxed),
        }
    }
}
