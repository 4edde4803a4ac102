//! Pattern detector contract
//!
//! Every pattern implementation, built-in or plug-in, satisfies
//! [`PatternDetector`]. Detectors are invoked from multiple workers
//! concurrently (always with different trades), must never block on I/O,
//! and install configuration updates atomically so in-flight `detect`
//! calls observe either the old or the new parameters, never a mix.

use crate::context::HistoricalContext;
use common::{Alert, Trade};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Failure signaled by a detector; recorded against the pattern's error
/// counter without affecting other detectors or re-queueing the trade.
#[derive(Debug, Error)]
pub enum DetectorError {
    /// The context lacks data the detector requires
    #[error("insufficient context: {0}")]
    InsufficientContext(String),

    /// Configuration could not be interpreted
    #[error("invalid pattern config: {0}")]
    Config(String),

    /// Any other detector-internal failure
    #[error("detector failure: {0}")]
    Internal(String),
}

/// Detector-specific parameter bag, loaded from the `patterns.<name>`
/// section of the engine config file.
#[derive(Debug, Clone, Default)]
pub struct PatternConfig {
    params: serde_json::Value,
}

impl PatternConfig {
    /// Wrap a raw JSON parameter object
    pub fn new(params: serde_json::Value) -> Self {
        Self { params }
    }

    /// Typed view of the parameters. Absent keys fall back to the target's
    /// defaults; an absent object yields the target's `Default` entirely.
    pub fn parse<T: DeserializeOwned + Default>(&self) -> Result<T, DetectorError> {
        if self.params.is_null() {
            return Ok(T::default());
        }
        serde_json::from_value(self.params.clone())
            .map_err(|e| DetectorError::Config(e.to_string()))
    }

    /// Look up a float parameter
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.params.get(key).and_then(serde_json::Value::as_f64)
    }

    /// Look up an integer parameter
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.params.get(key).and_then(serde_json::Value::as_u64)
    }

    /// Look up a boolean parameter
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.params.get(key).and_then(serde_json::Value::as_bool)
    }

    /// The conventional `enabled` flag, honored at config load
    pub fn enabled(&self) -> Option<bool> {
        self.get_bool("enabled")
    }
}

/// Capability set every pattern implementation provides
pub trait PatternDetector: Send + Sync {
    /// Stable identifier the detector registers under
    fn name(&self) -> &str;

    /// Inspect one trade against its historical context.
    ///
    /// Pure with respect to engine state; detector-local state is
    /// permitted but must tolerate concurrent invocation for different
    /// trades. Must not block on I/O.
    fn detect(
        &self,
        trade: &Trade,
        context: &HistoricalContext,
    ) -> Result<Option<Alert>, DetectorError>;

    /// Atomically install new parameters
    fn update_config(&self, config: &PatternConfig);
}
