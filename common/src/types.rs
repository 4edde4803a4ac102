//! Core scalar types shared across the platform

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Timestamp in nanoseconds since UNIX epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ts(pub u64);

impl Ts {
    /// Get current wall-clock timestamp
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_else(|_| Duration::from_secs(0))
            .as_nanos();
        Self(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Create timestamp from nanoseconds
    pub fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Create timestamp from whole seconds
    pub fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1_000_000_000))
    }

    /// Get timestamp as nanoseconds
    pub fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Get timestamp as milliseconds
    pub fn as_millis(&self) -> u64 {
        self.0 / 1_000_000
    }

    /// Timestamp shifted back by `dur`, saturating at the epoch
    pub fn saturating_sub(&self, dur: Duration) -> Self {
        Self(
            self.0
                .saturating_sub(u64::try_from(dur.as_nanos()).unwrap_or(u64::MAX)),
        )
    }

    /// Timestamp shifted forward by `dur`, saturating at `u64::MAX`
    pub fn saturating_add(&self, dur: Duration) -> Self {
        Self(
            self.0
                .saturating_add(u64::try_from(dur.as_nanos()).unwrap_or(u64::MAX)),
        )
    }

    /// Nanoseconds elapsed from `earlier` to `self`, zero if `earlier` is newer
    pub fn nanos_since(&self, earlier: Ts) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Ts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

/// Direction of an executed trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeType {
    /// Opening or adding to a long position
    Buy,
    /// Closing or reducing a long position
    Sell,
    /// Opening a short position
    ShortSell,
    /// Closing a short position
    Cover,
}

impl TradeType {
    /// Whether the trade adds buy-side pressure
    pub fn is_buy_side(&self) -> bool {
        matches!(self, Self::Buy | Self::Cover)
    }

    /// Whether the trade adds sell-side pressure
    pub fn is_sell_side(&self) -> bool {
        !self.is_buy_side()
    }
}

/// Market segment a trade was executed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketSegment {
    /// Cash equities
    Equity,
    /// Futures contracts
    Futures,
    /// Options contracts
    Options,
    /// Commodity contracts
    Commodity,
    /// Currency pairs
    Currency,
}
