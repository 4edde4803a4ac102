//! Pump-and-dump detection
//!
//! Flags a trade whose price departs sharply from the window average while
//! volume surges past the rolling baseline, the classic inflate-then-exit
//! signature.

use crate::context::HistoricalContext;
use crate::detector::{DetectorError, PatternConfig, PatternDetector};
use common::{Alert, AlertSeverity, Trade};
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::warn;

/// Thresholds for pump-and-dump detection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PumpDumpConfig {
    /// Price deviation from the window average, in percent
    pub price_spike_pct: f64,
    /// Trade quantity as a multiple of the window's average volume
    pub volume_multiplier: f64,
    /// Minimum trades in the window before the signal is meaningful
    pub min_window_trades: usize,
}

impl Default for PumpDumpConfig {
    fn default() -> Self {
        Self {
            price_spike_pct: 5.0,
            volume_multiplier: 3.0,
            min_window_trades: 5,
        }
    }
}

/// Detects price spikes paired with volume surges
pub struct PumpDumpDetector {
    config: RwLock<PumpDumpConfig>,
}

impl PumpDumpDetector {
    /// Detector with default thresholds
    pub fn new() -> Self {
        Self::with_config(PumpDumpConfig::default())
    }

    /// Detector with explicit thresholds
    pub fn with_config(config: PumpDumpConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }
}

impl Default for PumpDumpDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternDetector for PumpDumpDetector {
    fn name(&self) -> &str {
        "pump_dump"
    }

    fn detect(
        &self,
        trade: &Trade,
        context: &HistoricalContext,
    ) -> Result<Option<Alert>, DetectorError> {
        let config = self.config.read().clone();

        if context.recent_trades.len() < config.min_window_trades || context.avg_price <= 0.0 {
            return Ok(None);
        }

        let spike_pct = (trade.price - context.avg_price) / context.avg_price * 100.0;
        let volume_surge = context.avg_volume > 0.0
            && trade.quantity as f64 >= config.volume_multiplier * context.avg_volume;

        if spike_pct.abs() < config.price_spike_pct || !volume_surge {
            return Ok(None);
        }

        let severity = if spike_pct.abs() >= 2.0 * config.price_spike_pct {
            AlertSeverity::Critical
        } else {
            AlertSeverity::High
        };
        let direction = if spike_pct > 0.0 { "above" } else { "below" };

        Ok(Some(
            Alert::new(
                self.name(),
                "MARKET_MANIPULATION",
                "Pump-and-dump pattern suspected",
                format!(
                    "Trade {} executed {:.2}% {} the rolling average with a {}x volume surge",
                    trade.trade_id,
                    spike_pct.abs(),
                    direction,
                    config.volume_multiplier
                ),
                severity,
                &trade.trade_id,
            )
            .with_evidence("price_spike_pct", format!("{spike_pct:.2}"))
            .with_evidence("avg_price", format!("{:.2}", context.avg_price))
            .with_evidence("avg_volume", format!("{:.2}", context.avg_volume))
            .with_evidence("trade_quantity", trade.quantity.to_string()),
        ))
    }

    fn update_config(&self, config: &PatternConfig) {
        match config.parse::<PumpDumpConfig>() {
            Ok(parsed) => *self.config.write() = parsed,
            Err(e) => warn!(pattern = self.name(), error = %e, "config rejected"),
        }
    }
}
