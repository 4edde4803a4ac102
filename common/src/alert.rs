//! Surveillance alert emitted by pattern detectors

use crate::types::Ts;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Alert severity, ordered from least to most urgent
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    /// Informational finding
    Low,
    /// Worth an analyst's look
    Medium,
    /// Likely manipulative activity
    High,
    /// Immediate escalation required
    Critical,
}

/// Structured finding emitted by a detector.
///
/// The payload is opaque to the engine and delivered to the alert sink
/// unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Category of the finding, e.g. `MARKET_MANIPULATION`
    pub alert_type: String,
    /// Short human-readable title
    pub title: String,
    /// Longer description of what was observed
    pub description: String,
    /// Severity of the finding
    pub severity: AlertSeverity,
    /// Detector that produced the alert
    pub pattern_name: String,
    /// Trade that triggered the detection
    pub trade_id: String,
    /// When the alert was generated
    pub timestamp: Ts,
    /// Free-form supporting evidence
    #[serde(default)]
    pub evidence: FxHashMap<String, String>,
}

impl Alert {
    /// Create an alert with an empty evidence map
    pub fn new(
        pattern_name: impl Into<String>,
        alert_type: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        severity: AlertSeverity,
        trade_id: impl Into<String>,
    ) -> Self {
        Self {
            alert_type: alert_type.into(),
            title: title.into(),
            description: description.into(),
            severity,
            pattern_name: pattern_name.into(),
            trade_id: trade_id.into(),
            timestamp: Ts::now(),
            evidence: FxHashMap::default(),
        }
    }

    /// Attach one evidence entry
    pub fn with_evidence(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.evidence.insert(key.into(), value.into());
        self
    }
}
