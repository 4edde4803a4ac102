//! Insider trading detection
//!
//! A position far above the account's rolling volume taken while the
//! instrument is quiet suggests the trader knows something the tape does
//! not show yet.

use crate::context::HistoricalContext;
use crate::detector::{DetectorError, PatternConfig, PatternDetector};
use common::{Alert, AlertSeverity, Trade};
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::warn;

/// Thresholds for insider trading detection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InsiderTradingConfig {
    /// Trade quantity as a multiple of the window's average volume
    pub volume_multiplier: f64,
    /// Maximum volatility, as percent of the average price, still
    /// considered quiet
    pub quiet_volatility_pct: f64,
    /// Minimum trades in the window before the signal is meaningful
    pub min_window_trades: usize,
}

impl Default for InsiderTradingConfig {
    fn default() -> Self {
        Self {
            volume_multiplier: 5.0,
            quiet_volatility_pct: 0.5,
            min_window_trades: 3,
        }
    }
}

/// Detects outsized positions taken into a quiet market
pub struct InsiderTradingDetector {
    config: RwLock<InsiderTradingConfig>,
}

impl InsiderTradingDetector {
    /// Detector with default thresholds
    pub fn new() -> Self {
        Self::with_config(InsiderTradingConfig::default())
    }

    /// Detector with explicit thresholds
    pub fn with_config(config: InsiderTradingConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }
}

impl Default for InsiderTradingDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternDetector for InsiderTradingDetector {
    fn name(&self) -> &str {
        "insider_trading"
    }

    fn detect(
        &self,
        trade: &Trade,
        context: &HistoricalContext,
    ) -> Result<Option<Alert>, DetectorError> {
        let config = self.config.read().clone();

        if context.recent_trades.len() < config.min_window_trades
            || context.avg_volume <= 0.0
            || context.avg_price <= 0.0
        {
            return Ok(None);
        }

        let volume_ratio = trade.quantity as f64 / context.avg_volume;
        if volume_ratio < config.volume_multiplier {
            return Ok(None);
        }

        let volatility_pct = context.price_volatility / context.avg_price * 100.0;
        if volatility_pct > config.quiet_volatility_pct {
            return Ok(None);
        }

        let severity = if volume_ratio >= 2.0 * config.volume_multiplier {
            AlertSeverity::High
        } else {
            AlertSeverity::Medium
        };

        Ok(Some(
            Alert::new(
                self.name(),
                "INSIDER_TRADING",
                "Outsized position in quiet market",
                format!(
                    "Trade {} is {:.1}x the rolling volume while volatility is {:.2}%",
                    trade.trade_id, volume_ratio, volatility_pct
                ),
                severity,
                &trade.trade_id,
            )
            .with_evidence("volume_ratio", format!("{volume_ratio:.2}"))
            .with_evidence("volatility_pct", format!("{volatility_pct:.3}"))
            .with_evidence("avg_volume", format!("{:.2}", context.avg_volume)),
        ))
    }

    fn update_config(&self, config: &PatternConfig) {
        match config.parse::<InsiderTradingConfig>() {
            Ok(parsed) => *self.config.write() = parsed,
            Err(e) => warn!(pattern = self.name(), error = %e, "config rejected"),
        }
    }
}
