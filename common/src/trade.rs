//! Trade record and context key

use crate::types::{MarketSegment, TradeType, Ts};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One executed transaction on a market, immutable once submitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Unique trade identifier
    pub trade_id: String,
    /// Instrument the trade executed on
    pub instrument_symbol: String,
    /// Account that executed the trade
    pub account_id: String,
    /// Client behind the account
    pub client_id: String,
    /// Originating order
    pub order_id: String,
    /// Trader who placed the order
    pub trader_id: String,
    /// Trade direction
    pub trade_type: TradeType,
    /// Market segment
    pub segment: MarketSegment,
    /// Executed quantity, must be positive
    pub quantity: u64,
    /// Execution price, must be positive
    pub price: f64,
    /// Notional value, must be positive
    pub value: f64,
    /// Executing exchange
    pub exchange: String,
    /// Execution wall-clock time
    pub timestamp: Ts,
    /// Brokerage charged, when known
    #[serde(default)]
    pub brokerage: Option<f64>,
    /// Taxes charged, when known
    #[serde(default)]
    pub taxes: Option<f64>,
    /// Whether the trade was for the firm's own book
    #[serde(default)]
    pub is_own_account: Option<bool>,
}

impl Trade {
    /// Structural validity: non-empty identifiers, positive quantity,
    /// price and value. Future-dating is checked at ingress against the
    /// clock, not here.
    pub fn is_valid(&self) -> bool {
        !self.trade_id.is_empty()
            && !self.instrument_symbol.is_empty()
            && self.quantity > 0
            && self.price > 0.0
            && self.value > 0.0
    }

    /// Whether the firm's own book executed this trade
    pub fn is_own_account(&self) -> bool {
        self.is_own_account.unwrap_or(false)
    }
}

/// Key under which per-trade historical context is aggregated.
///
/// A structured pair rather than a joined string, so identifiers that
/// contain separator characters can never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextKey {
    /// Instrument leg of the key
    pub instrument: String,
    /// Account leg of the key
    pub account: String,
}

impl ContextKey {
    /// Create a key from its parts
    pub fn new(instrument: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            instrument: instrument.into(),
            account: account.into(),
        }
    }

    /// Key for the context a trade belongs to
    pub fn from_trade(trade: &Trade) -> Self {
        Self {
            instrument: trade.instrument_symbol.clone(),
            account: trade.account_id.clone(),
        }
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.instrument, self.account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trade() -> Trade {
        Trade {
            trade_id: "T1".into(),
            instrument_symbol: "RELIANCE".into(),
            account_id: "ACC1".into(),
            client_id: "CL1".into(),
            order_id: "O1".into(),
            trader_id: "TR1".into(),
            trade_type: TradeType::Buy,
            segment: MarketSegment::Equity,
            quantity: 100,
            price: 2500.0,
            value: 250_000.0,
            exchange: "NSE".into(),
            timestamp: Ts::from_secs(1_700_000_000),
            brokerage: None,
            taxes: None,
            is_own_account: None,
        }
    }

    #[test]
    fn test_valid_trade() {
        assert!(sample_trade().is_valid());
    }

    #[test]
    fn test_invalid_trades() {
        let mut t = sample_trade();
        t.trade_id.clear();
        assert!(!t.is_valid());

        let mut t = sample_trade();
        t.instrument_symbol.clear();
        assert!(!t.is_valid());

        let mut t = sample_trade();
        t.quantity = 0;
        assert!(!t.is_valid());

        let mut t = sample_trade();
        t.price = 0.0;
        assert!(!t.is_valid());

        let mut t = sample_trade();
        t.value = -1.0;
        assert!(!t.is_valid());
    }

    #[test]
    fn test_context_key_distinguishes_separator_collisions() {
        // "A_B" + "C" must never equal "A" + "B_C"
        let k1 = ContextKey::new("A_B", "C");
        let k2 = ContextKey::new("A", "B_C");
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_context_key_from_trade() {
        let t = sample_trade();
        let key = ContextKey::from_trade(&t);
        assert_eq!(key.instrument, "RELIANCE");
        assert_eq!(key.account, "ACC1");
    }
}
