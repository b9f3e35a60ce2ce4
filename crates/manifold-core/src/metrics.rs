//! Per-engine performance metrics.
//!
//! Each engine gets an invocation counter, success/failure counters, and a
//! bounded rolling window of success latencies. Aggregates are computed on
//! demand in [`MetricsCollector::snapshot`] rather than incrementally, so
//! there is no derived state to go stale; windows are small and snapshots
//! are infrequent relative to request volume.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;

use crate::engine::EngineId;

/// Number of latency samples retained per engine.
pub const LATENCY_WINDOW: usize = 100;

#[derive(Debug, Default)]
struct EngineRecord {
    invocations: u64,
    successes: u64,
    failures: u64,
    latencies_ms: VecDeque<u64>,
}

/// Aggregated view of one engine's recorded performance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStats {
    pub invocations: u64,
    pub successes: u64,
    pub failures: u64,
    /// Mean over the rolling window of success latencies. `None` when no
    /// sample has been recorded; unknown latency is not zero latency.
    pub avg_latency_ms: Option<f64>,
    pub success_rate: f64,
}

/// Records engine outcomes and cache hit/miss counters for the process
/// lifetime. Cleared only by the administrative [`MetricsCollector::clear`].
#[derive(Default)]
pub struct MetricsCollector {
    records: DashMap<EngineId, EngineRecord>,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful execution and its latency.
    ///
    /// The oldest sample is dropped once the window is full.
    pub fn record_success(&self, id: &EngineId, latency_ms: u64) {
        let mut record = self.records.entry(id.clone()).or_default();
        record.invocations += 1;
        record.successes += 1;
        record.latencies_ms.push_back(latency_ms);
        if record.latencies_ms.len() > LATENCY_WINDOW {
            record.latencies_ms.pop_front();
        }
    }

    /// Record a failed execution. Failures carry no latency sample.
    pub fn record_failure(&self, id: &EngineId) {
        let mut record = self.records.entry(id.clone()).or_default();
        record.invocations += 1;
        record.failures += 1;
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    /// Aggregates for a single engine, if anything has been recorded.
    pub fn stats_for(&self, id: &EngineId) -> Option<EngineStats> {
        self.records.get(id).map(|record| aggregate(&record))
    }

    /// Compute aggregates for every engine with recorded activity.
    pub fn snapshot(&self) -> HashMap<EngineId, EngineStats> {
        self.records
            .iter()
            .map(|entry| (entry.key().clone(), aggregate(entry.value())))
            .collect()
    }

    /// Administrative reset of all counters and windows.
    pub fn clear(&self) {
        self.records.clear();
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
    }
}

fn aggregate(record: &EngineRecord) -> EngineStats {
    let avg_latency_ms = if record.latencies_ms.is_empty() {
        None
    } else {
        let sum: u64 = record.latencies_ms.iter().sum();
        Some(sum as f64 / record.latencies_ms.len() as f64)
    };
    let success_rate = if record.invocations == 0 {
        0.0
    } else {
        record.successes as f64 / record.invocations as f64
    };

    EngineStats {
        invocations: record.invocations,
        successes: record.successes,
        failures: record.failures,
        avg_latency_ms,
        success_rate,
    }
}
