//! Front running detection
//!
//! An own-account execution stepping in front of unusually large resting
//! interest on the same side of the book. Requires a quote snapshot; with
//! no quote feed the detector stays silent.

use crate::context::HistoricalContext;
use crate::detector::{DetectorError, PatternConfig, PatternDetector};
use common::{Alert, AlertSeverity, Trade};
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::warn;

/// Thresholds for front running detection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FrontRunningConfig {
    /// Resting same-side quantity as a multiple of the window's average
    /// volume
    pub interest_multiplier: f64,
    /// Absolute floor on the resting quantity
    pub min_resting_quantity: u64,
}

impl Default for FrontRunningConfig {
    fn default() -> Self {
        Self {
            interest_multiplier: 4.0,
            min_resting_quantity: 1_000,
        }
    }
}

/// Detects own-account trades ahead of large standing interest
pub struct FrontRunningDetector {
    config: RwLock<FrontRunningConfig>,
}

impl FrontRunningDetector {
    /// Detector with default thresholds
    pub fn new() -> Self {
        Self::with_config(FrontRunningConfig::default())
    }

    /// Detector with explicit thresholds
    pub fn with_config(config: FrontRunningConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }
}

impl Default for FrontRunningDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternDetector for FrontRunningDetector {
    fn name(&self) -> &str {
        "front_running"
    }

    fn detect(
        &self,
        trade: &Trade,
        context: &HistoricalContext,
    ) -> Result<Option<Alert>, DetectorError> {
        if !trade.is_own_account() {
            return Ok(None);
        }
        let Some(quote) = &context.quote else {
            return Ok(None);
        };
        let config = self.config.read().clone();

        let resting = if trade.trade_type.is_buy_side() {
            quote.bid_quantity
        } else {
            quote.ask_quantity
        };

        if resting < config.min_resting_quantity {
            return Ok(None);
        }
        if context.avg_volume > 0.0
            && (resting as f64) < config.interest_multiplier * context.avg_volume
        {
            return Ok(None);
        }

        let side = if trade.trade_type.is_buy_side() {
            "bid"
        } else {
            "ask"
        };

        Ok(Some(
            Alert::new(
                self.name(),
                "FRONT_RUNNING",
                "Own-account trade ahead of resting interest",
                format!(
                    "Own-account trade {} executed with {} resting on the {} side",
                    trade.trade_id, resting, side
                ),
                AlertSeverity::Critical,
                &trade.trade_id,
            )
            .with_evidence("resting_quantity", resting.to_string())
            .with_evidence("side", side.to_string())
            .with_evidence("avg_volume", format!("{:.2}", context.avg_volume)),
        ))
    }

    fn update_config(&self, config: &PatternConfig) {
        match config.parse::<FrontRunningConfig>() {
            Ok(parsed) => *self.config.write() = parsed,
            Err(e) => warn!(pattern = self.name(), error = %e, "config rejected"),
        }
    }
}
