//! Hot-path counters and the statistics snapshot
//!
//! All counters are plain atomics updated without locks from the submit
//! path, the workers and the dispatcher. A snapshot loads each counter
//! independently; consistency is per-counter, not global.

use common::Ts;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Engine-wide atomic counters
#[derive(Debug, Default)]
pub struct EngineCounters {
    /// Submit calls made while the engine was running
    pub trades_submitted: AtomicU64,
    /// Trades fully processed by a worker
    pub trades_processed: AtomicU64,
    /// Alerts produced by detectors
    pub alerts_generated: AtomicU64,
    /// Trades rejected at ingress for failing validation
    pub validation_rejects: AtomicU64,
    /// Trades dropped at ingress for pool or queue exhaustion
    pub submit_drops: AtomicU64,
    /// Alerts dropped after the bounded enqueue wait expired
    pub alert_drops: AtomicU64,
    /// Alert sink invocations that signaled an error
    pub sink_errors: AtomicU64,
    /// Cumulative per-trade processing time
    pub total_processing_time_ns: AtomicU64,
    /// Largest single-trade processing time observed
    pub peak_processing_time_ns: AtomicU64,
}

impl EngineCounters {
    /// Fresh zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one processed trade's latency
    #[inline(always)]
    pub fn record_processing(&self, delta_ns: u64) {
        self.total_processing_time_ns
            .fetch_add(delta_ns, Ordering::Relaxed);

        let mut current = self.peak_processing_time_ns.load(Ordering::Relaxed);
        while delta_ns > current {
            match self.peak_processing_time_ns.compare_exchange_weak(
                current,
                delta_ns,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }

    /// Zero every counter
    pub fn reset(&self) {
        self.trades_submitted.store(0, Ordering::Relaxed);
        self.trades_processed.store(0, Ordering::Relaxed);
        self.alerts_generated.store(0, Ordering::Relaxed);
        self.validation_rejects.store(0, Ordering::Relaxed);
        self.submit_drops.store(0, Ordering::Relaxed);
        self.alert_drops.store(0, Ordering::Relaxed);
        self.sink_errors.store(0, Ordering::Relaxed);
        self.total_processing_time_ns.store(0, Ordering::Relaxed);
        self.peak_processing_time_ns.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time statistics snapshot
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingStats {
    /// Submit calls made while running
    pub trades_submitted: u64,
    /// Trades fully processed
    pub trades_processed: u64,
    /// Alerts produced by detectors
    pub alerts_generated: u64,
    /// Ingress validation rejections
    pub validation_rejects: u64,
    /// Ingress resource-exhaustion drops
    pub submit_drops: u64,
    /// Alerts dropped on backpressure
    pub alert_drops: u64,
    /// Sink invocation failures
    pub sink_errors: u64,
    /// Mean per-trade processing time
    pub avg_processing_time_ns: u64,
    /// Peak per-trade processing time
    pub peak_processing_time_ns: u64,
    /// Trades per second since the last statistics reset
    pub throughput_trades_per_second: f64,
    /// Current ingress queue depth (best effort)
    pub queue_size: usize,
    /// Alerts emitted per pattern
    pub pattern_alerts_count: FxHashMap<String, u64>,
    /// Cumulative detector time per pattern
    pub pattern_processing_time_ns: FxHashMap<String, u64>,
    /// Detect failures per pattern
    pub pattern_errors: FxHashMap<String, u64>,
    /// When this snapshot was taken
    pub snapshot_at: Ts,
}
