//! Concurrent pattern detector registry
//!
//! Maps pattern name to a shared [`DetectorEntry`] holding the enable flag
//! and the pattern's hot-path counters next to the detector itself. Entries
//! are `Arc`-shared with any worker currently fanning out a trade, so a
//! snapshot stays valid for the whole detection pass regardless of
//! concurrent toggles or re-registration.

use crate::detector::{PatternConfig, PatternDetector};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// One registered pattern with its flag, counters and detector
pub struct DetectorEntry {
    name: String,
    enabled: AtomicBool,
    detector: Arc<dyn PatternDetector>,
    alerts_count: AtomicU64,
    processing_time_ns: AtomicU64,
    error_count: AtomicU64,
}

impl DetectorEntry {
    fn new(name: String, detector: Arc<dyn PatternDetector>) -> Self {
        Self {
            name,
            enabled: AtomicBool::new(true),
            detector,
            alerts_count: AtomicU64::new(0),
            processing_time_ns: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
        }
    }

    /// Pattern name this entry is registered under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether workers should invoke this detector
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Flip the enable flag without evicting the entry
    pub fn set_enabled(&self, flag: bool) {
        self.enabled.store(flag, Ordering::Release);
    }

    /// The detector capability
    pub fn detector(&self) -> &dyn PatternDetector {
        self.detector.as_ref()
    }

    /// Count one emitted alert
    #[inline(always)]
    pub fn record_alert(&self) {
        self.alerts_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one detect failure
    #[inline(always)]
    pub fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Add detector wall time for one invocation
    #[inline(always)]
    pub fn record_time(&self, delta_ns: u64) {
        self.processing_time_ns.fetch_add(delta_ns, Ordering::Relaxed);
    }

    /// Alerts emitted so far
    pub fn alerts_count(&self) -> u64 {
        self.alerts_count.load(Ordering::Relaxed)
    }

    /// Cumulative detector time so far
    pub fn processing_time_ns(&self) -> u64 {
        self.processing_time_ns.load(Ordering::Relaxed)
    }

    /// Detect failures so far
    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Zero this entry's counters
    pub fn reset_counters(&self) {
        self.alerts_count.store(0, Ordering::Relaxed);
        self.processing_time_ns.store(0, Ordering::Relaxed);
        self.error_count.store(0, Ordering::Relaxed);
    }
}

/// Concurrent registry of pattern detectors
#[derive(Default)]
pub struct DetectorRegistry {
    entries: DashMap<String, Arc<DetectorEntry>>,
}

impl DetectorRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a detector under `name`. Replaces an existing entry of the
    /// same name (its counters start over).
    pub fn register(&self, name: &str, detector: Arc<dyn PatternDetector>) {
        let entry = Arc::new(DetectorEntry::new(name.to_owned(), detector));
        if self.entries.insert(name.to_owned(), entry).is_some() {
            warn!(pattern = name, "replacing already-registered detector");
        } else {
            info!(pattern = name, "registered pattern detector");
        }
    }

    /// Toggle a pattern. Returns false when the name is unknown.
    pub fn set_enabled(&self, name: &str, flag: bool) -> bool {
        match self.entries.get(name) {
            Some(entry) => {
                entry.set_enabled(flag);
                info!(
                    pattern = name,
                    enabled = flag,
                    "pattern toggled"
                );
                true
            }
            None => {
                warn!(pattern = name, "toggle for unknown pattern");
                false
            }
        }
    }

    /// Forward new parameters to a pattern. Returns false when the name is
    /// unknown.
    pub fn update_config(&self, name: &str, config: &PatternConfig) -> bool {
        match self.entries.get(name) {
            Some(entry) => {
                entry.detector().update_config(config);
                info!(pattern = name, "pattern config updated");
                true
            }
            None => {
                warn!(pattern = name, "config update for unknown pattern");
                false
            }
        }
    }

    /// Look up one entry
    pub fn get(&self, name: &str) -> Option<Arc<DetectorEntry>> {
        self.entries.get(name).map(|e| Arc::clone(e.value()))
    }

    /// Fill `buf` with the currently enabled entries. The buffer is a
    /// worker-owned scratch vector reused across trades; entries stay
    /// valid for the whole detection pass through their `Arc`.
    pub fn snapshot_enabled_into(&self, buf: &mut Vec<Arc<DetectorEntry>>) {
        buf.clear();
        for entry in self.entries.iter() {
            if entry.value().is_enabled() {
                buf.push(Arc::clone(entry.value()));
            }
        }
    }

    /// All entries, for statistics snapshots
    pub fn entries(&self) -> Vec<Arc<DetectorEntry>> {
        self.entries
            .iter()
            .map(|e| Arc::clone(e.value()))
            .collect()
    }

    /// Number of registered patterns
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no pattern is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
