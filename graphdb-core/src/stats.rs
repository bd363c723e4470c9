use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Smoothing factor for the query-latency exponential moving average:
/// `new = alpha * sample + (1 - alpha) * old`.
const EMA_ALPHA: f64 = 0.1;

/// Live, atomically-updated counters for a graph store. Read via
/// [`Statistics::snapshot`]; cheap to update from any thread holding even a
/// shared lock over the store, since every field here is independently
/// atomic.
#[derive(Debug, Default)]
pub struct Statistics {
    query_count: AtomicU64,
    avg_query_latency_ms_bits: AtomicU64,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_query(&self, duration_ms: f64) {
        self.query_count.fetch_add(1, Ordering::Relaxed);
        loop {
            let old_bits = self.avg_query_latency_ms_bits.load(Ordering::Relaxed);
            let old = f64::from_bits(old_bits);
            let new = if old == 0.0 {
                duration_ms
            } else {
                EMA_ALPHA * duration_ms + (1.0 - EMA_ALPHA) * old
            };
            let new_bits = new.to_bits();
            if self
                .avg_query_latency_ms_bits
                .compare_exchange_weak(old_bits, new_bits, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
        }
    }

    pub fn query_count(&self) -> u64 {
        self.query_count.load(Ordering::Relaxed)
    }

    pub fn avg_query_latency_ms(&self) -> f64 {
        f64::from_bits(self.avg_query_latency_ms_bits.load(Ordering::Relaxed))
    }

    pub fn snapshot(&self, node_count: usize, edge_count: usize) -> StoreStatistics {
        StoreStatistics {
            node_count,
            edge_count,
            query_count: self.query_count(),
            avg_query_latency_ms: self.avg_query_latency_ms(),
        }
    }

    /// Restores counters from a loaded snapshot's statistics block.
    pub fn restore(&self, query_count: u64, avg_query_latency_ms: f64) {
        self.query_count.store(query_count, Ordering::Relaxed);
        self.avg_query_latency_ms_bits
            .store(avg_query_latency_ms.to_bits(), Ordering::Relaxed);
    }
}

/// Point-in-time read-only view of [`Statistics`], returned by the graph
/// store's `statistics()` operation and persisted in snapshots.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StoreStatistics {
    pub node_count: usize,
    pub edge_count: usize,
    pub query_count: u64,
    pub avg_query_latency_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_seeds_the_average() {
        let stats = Statistics::new();
        stats.record_query(10.0);
        assert_eq!(stats.avg_query_latency_ms(), 10.0);
        assert_eq!(stats.query_count(), 1);
    }

    #[test]
    fn ema_moves_toward_new_samples() {
        let stats = Statistics::new();
        stats.record_query(10.0);
        stats.record_query(20.0);
        let avg = stats.avg_query_latency_ms();
        assert!(avg > 10.0 && avg < 20.0);
    }

    #[test]
    fn restore_sets_exact_values() {
        let stats = Statistics::new();
        stats.restore(42, 7.5);
        assert_eq!(stats.query_count(), 42);
        assert_eq!(stats.avg_query_latency_ms(), 7.5);
    }
}
