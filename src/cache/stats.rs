//! Cache Statistics Module
//!
//! Tracks lookup and retrieval counters for the cache manager.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Lookups that found an entry
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Transport calls issued (fetch and preload)
    pub fetches: u64,
    /// Fetch calls that joined an in-flight retrieval
    pub coalesced: u64,
    /// Transport calls that failed
    pub fetch_failures: u64,
    /// Successful retrievals not written back because of a clear
    pub suppressed_writes: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
    /// Sum of recorded entry sizes in bytes
    pub total_bytes: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_fetch(&mut self) {
        self.fetches += 1;
    }

    pub fn record_coalesced(&mut self) {
        self.coalesced += 1;
    }

    pub fn record_fetch_failure(&mut self) {
        self.fetch_failures += 1;
    }

    pub fn record_suppressed_write(&mut self) {
        self.suppressed_writes += 1;
    }

    // == Update Totals ==
    /// Updates the entry count and byte total.
    pub fn set_totals(&mut self, entries: usize, bytes: usize) {
        self.total_entries = entries;
        self.total_bytes = bytes;
    }
}
