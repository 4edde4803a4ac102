//! Layering detection
//!
//! Looks for a burst of small same-side trades by one account followed by
//! an opposite-side execution: the layers push the price, the reversal
//! captures it.

use crate::context::HistoricalContext;
use crate::detector::{DetectorError, PatternConfig, PatternDetector};
use common::{Alert, AlertSeverity, Trade};
use parking_lot::RwLock;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

/// Thresholds for layering detection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayeringConfig {
    /// Minimum opposite-side trades forming the burst
    pub min_layer_count: usize,
    /// A layer's quantity relative to the triggering execution
    pub layer_size_ratio: f64,
    /// How far back the burst may reach, in seconds
    pub burst_window_secs: u64,
}

impl Default for LayeringConfig {
    fn default() -> Self {
        Self {
            min_layer_count: 5,
            layer_size_ratio: 0.5,
            burst_window_secs: 30,
        }
    }
}

/// Detects layered order bursts reversed by an execution
pub struct LayeringDetector {
    config: RwLock<LayeringConfig>,
}

impl LayeringDetector {
    /// Detector with default thresholds
    pub fn new() -> Self {
        Self::with_config(LayeringConfig::default())
    }

    /// Detector with explicit thresholds
    pub fn with_config(config: LayeringConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }
}

impl Default for LayeringDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternDetector for LayeringDetector {
    fn name(&self) -> &str {
        "layering"
    }

    fn detect(
        &self,
        trade: &Trade,
        context: &HistoricalContext,
    ) -> Result<Option<Alert>, DetectorError> {
        let config = self.config.read().clone();
        let burst_start = trade
            .timestamp
            .saturating_sub(Duration::from_secs(config.burst_window_secs));
        let max_layer_quantity = (trade.quantity as f64 * config.layer_size_ratio) as u64;

        let layers = context
            .recent_trades
            .iter()
            .filter(|t| t.trade_id != trade.trade_id)
            .filter(|t| t.timestamp >= burst_start)
            .filter(|t| t.trade_type.is_buy_side() != trade.trade_type.is_buy_side())
            .filter(|t| t.quantity <= max_layer_quantity)
            .count();

        if layers < config.min_layer_count {
            return Ok(None);
        }

        Ok(Some(
            Alert::new(
                self.name(),
                "MARKET_MANIPULATION",
                "Layering pattern suspected",
                format!(
                    "{} small opposite-side trades within {}s preceded execution {}",
                    layers, config.burst_window_secs, trade.trade_id
                ),
                AlertSeverity::High,
                &trade.trade_id,
            )
            .with_evidence("layer_count", layers.to_string())
            .with_evidence("burst_window_secs", config.burst_window_secs.to_string())
            .with_evidence("execution_quantity", trade.quantity.to_string()),
        ))
    }

    fn update_config(&self, config: &PatternConfig) {
        match config.parse::<LayeringConfig>() {
            Ok(parsed) => *self.config.write() = parsed,
            Err(e) => warn!(pattern = self.name(), error = %e, "config rejected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{MarketSegment, TradeType, Ts};

    fn trade(id: &str, trade_type: TradeType, quantity: u64, secs: u64) -> Trade {
        Trade {
            trade_id: id.into(),
            instrument_symbol: "XYZ".into(),
            account_id: "ACC1".into(),
            client_id: "CL1".into(),
            order_id: format!("O-{id}"),
            trader_id: "TR1".into(),
            trade_type,
            segment: MarketSegment::Equity,
            quantity,
            price: 100.0,
            value: quantity as f64 * 100.0,
            exchange: "NSE".into(),
            timestamp: Ts::from_secs(secs),
            brokerage: None,
            taxes: None,
            is_own_account: None,
        }
    }

    fn burst_context(execution: &Trade, layers: usize) -> HistoricalContext {
        let mut ctx = HistoricalContext::new(Duration::from_secs(300));
        for i in 0..layers {
            ctx.recent_trades
                .push(trade(&format!("L{i}"), TradeType::Buy, 100, 80 + i as u64));
        }
        ctx.recent_trades.push(execution.clone());
        ctx
    }

    #[test]
    fn test_burst_then_reversal_alerts() {
        let detector = LayeringDetector::new();
        let execution = trade("SELL1", TradeType::Sell, 1000, 100);
        let ctx = burst_context(&execution, 6);

        let alert = detector
            .detect(&execution, &ctx)
            .expect("detect")
            .expect("alert");
        assert_eq!(alert.pattern_name, "layering");
        assert_eq!(alert.evidence["layer_count"], "6");
    }

    #[test]
    fn test_small_burst_is_quiet() {
        let detector = LayeringDetector::new();
        let execution = trade("SELL1", TradeType::Sell, 1000, 100);
        let ctx = burst_context(&execution, 3);

        assert!(detector.detect(&execution, &ctx).expect("detect").is_none());
    }

    #[test]
    fn test_same_side_burst_is_quiet() {
        let detector = LayeringDetector::new();
        // Burst and execution are both buys, so nothing was reversed.
        let execution = trade("BUY9", TradeType::Buy, 1000, 100);
        let ctx = burst_context(&execution, 6);

        assert!(detector.detect(&execution, &ctx).expect("detect").is_none());
    }

    #[test]
    fn test_stale_burst_outside_window_is_quiet() {
        let detector = LayeringDetector::new();
        let execution = trade("SELL1", TradeType::Sell, 1000, 500);
        // Layers sit at t=80..86, far outside the 30s burst window of t=500.
        let ctx = burst_context(&execution, 6);

        assert!(detector.detect(&execution, &ctx).expect("detect").is_none());
    }

    #[test]
    fn test_large_opposite_trades_are_not_layers() {
        let detector = LayeringDetector::new();
        let execution = trade("SELL1", TradeType::Sell, 1000, 100);
        let mut ctx = HistoricalContext::new(Duration::from_secs(300));
        for i in 0..6 {
            // Same size as the execution: too big to be layering noise.
            ctx.recent_trades
                .push(trade(&format!("L{i}"), TradeType::Buy, 1000, 80 + i));
        }
        ctx.recent_trades.push(execution.clone());

        assert!(detector.detect(&execution, &ctx).expect("detect").is_none());
    }
}
