//! Wash trading detection
//!
//! One account both buying and selling the same instrument inside the
//! window with near-balanced volume generates turnover without transferring
//! economic risk.

use crate::context::HistoricalContext;
use crate::detector::{DetectorError, PatternConfig, PatternDetector};
use common::{Alert, AlertSeverity, Trade};
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::warn;

/// Thresholds for wash trading detection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WashTradingConfig {
    /// Minimum smaller-side/larger-side volume ratio to call it balanced
    pub balance_ratio: f64,
    /// Minimum trades required on each side
    pub min_side_trades: usize,
    /// Minimum combined volume before the signal is meaningful
    pub min_total_volume: u64,
}

impl Default for WashTradingConfig {
    fn default() -> Self {
        Self {
            balance_ratio: 0.8,
            min_side_trades: 3,
            min_total_volume: 1_000,
        }
    }
}

/// Detects balanced two-sided turnover by a single account
pub struct WashTradingDetector {
    config: RwLock<WashTradingConfig>,
}

impl WashTradingDetector {
    /// Detector with default thresholds
    pub fn new() -> Self {
        Self::with_config(WashTradingConfig::default())
    }

    /// Detector with explicit thresholds
    pub fn with_config(config: WashTradingConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }
}

impl Default for WashTradingDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternDetector for WashTradingDetector {
    fn name(&self) -> &str {
        "wash_trading"
    }

    fn detect(
        &self,
        trade: &Trade,
        context: &HistoricalContext,
    ) -> Result<Option<Alert>, DetectorError> {
        let config = self.config.read().clone();

        let mut buy_volume = 0u64;
        let mut sell_volume = 0u64;
        let mut buy_count = 0usize;
        let mut sell_count = 0usize;
        for t in &context.recent_trades {
            if t.trade_type.is_buy_side() {
                buy_volume += t.quantity;
                buy_count += 1;
            } else {
                sell_volume += t.quantity;
                sell_count += 1;
            }
        }

        if buy_count < config.min_side_trades || sell_count < config.min_side_trades {
            return Ok(None);
        }
        if buy_volume + sell_volume < config.min_total_volume {
            return Ok(None);
        }

        let larger = buy_volume.max(sell_volume) as f64;
        let smaller = buy_volume.min(sell_volume) as f64;
        if larger <= 0.0 || smaller / larger < config.balance_ratio {
            return Ok(None);
        }

        Ok(Some(
            Alert::new(
                self.name(),
                "MARKET_MANIPULATION",
                "Wash trading suspected",
                format!(
                    "Account {} bought {} and sold {} of {} within the window",
                    trade.account_id, buy_volume, sell_volume, trade.instrument_symbol
                ),
                AlertSeverity::High,
                &trade.trade_id,
            )
            .with_evidence("buy_volume", buy_volume.to_string())
            .with_evidence("sell_volume", sell_volume.to_string())
            .with_evidence("buy_count", buy_count.to_string())
            .with_evidence("sell_count", sell_count.to_string()),
        ))
    }

    fn update_config(&self, config: &PatternConfig) {
        match config.parse::<WashTradingConfig>() {
            Ok(parsed) => *self.config.write() = parsed,
            Err(e) => warn!(pattern = self.name(), error = %e, "config rejected"),
        }
    }
}
