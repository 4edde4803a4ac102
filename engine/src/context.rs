//! Concurrent sliding-window context store
//!
//! Maps `(instrument, account)` keys to a rolling window of recent trades
//! plus derived statistics, and keeps a secondary per-account window so
//! detectors can see an account's activity across instruments. Updates for
//! the same key are serialized by a per-entry lock; different keys proceed
//! in parallel on separate map shards. Pruning uses the event timestamp of
//! the incoming trade, never the wall clock, so a late out-of-order trade
//! cannot expunge newer entries.

use common::{ContextKey, Trade};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Latest top-of-book snapshot for a context key
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteSnapshot {
    /// Best bid price
    pub bid_price: f64,
    /// Best ask price
    pub ask_price: f64,
    /// Quantity resting at the best bid
    pub bid_quantity: u64,
    /// Quantity resting at the best ask
    pub ask_quantity: u64,
}

/// Value-semantic context snapshot handed to detectors.
///
/// Reflects the state including the triggering trade and is safe to read
/// without any locking.
#[derive(Debug, Clone)]
pub struct HistoricalContext {
    /// Retention horizon of this key's window
    pub lookback_window: Duration,
    /// Trades for the key, ordered by timestamp, within the window
    pub recent_trades: Vec<Trade>,
    /// Mean trade quantity over the window
    pub avg_volume: f64,
    /// Mean trade price over the window
    pub avg_price: f64,
    /// Standard deviation of trade prices over the window
    pub price_volatility: f64,
    /// Latest quote snapshot, when a feed supplied one
    pub quote: Option<QuoteSnapshot>,
    /// The account's trades across all instruments, same window
    pub account_recent_trades: Vec<Trade>,
    /// Total quantity the account traded in the window
    pub account_total_volume: f64,
    /// Accounts linked to this one by external enrichment
    pub related_accounts: Vec<String>,
    /// Other instruments the account touched in the window
    pub related_instruments: Vec<String>,
}

impl HistoricalContext {
    /// Empty context with the given retention horizon
    pub fn new(lookback_window: Duration) -> Self {
        Self {
            lookback_window,
            recent_trades: Vec::new(),
            avg_volume: 0.0,
            avg_price: 0.0,
            price_volatility: 0.0,
            quote: None,
            account_recent_trades: Vec::new(),
            account_total_volume: 0.0,
            related_accounts: Vec::new(),
            related_instruments: Vec::new(),
        }
    }
}

struct KeyWindow {
    lookback: Duration,
    trades: Vec<Trade>,
    avg_volume: f64,
    avg_price: f64,
    price_volatility: f64,
    quote: Option<QuoteSnapshot>,
}

impl KeyWindow {
    fn new(lookback: Duration) -> Self {
        Self {
            lookback,
            trades: Vec::new(),
            avg_volume: 0.0,
            avg_price: 0.0,
            price_volatility: 0.0,
            quote: None,
        }
    }

    /// Insert in timestamp order, prune, recompute. Returns how many
    /// trades fell out of the window.
    fn apply(&mut self, trade: &Trade) -> usize {
        let pos = self
            .trades
            .partition_point(|t| t.timestamp <= trade.timestamp);
        self.trades.insert(pos, trade.clone());

        let cutoff = trade.timestamp.saturating_sub(self.lookback);
        let expired = self.trades.partition_point(|t| t.timestamp < cutoff);
        self.trades.drain(..expired);

        self.recompute();
        expired
    }

    fn recompute(&mut self) {
        let n = self.trades.len();
        if n == 0 {
            self.avg_volume = 0.0;
            self.avg_price = 0.0;
            self.price_volatility = 0.0;
            return;
        }
        let count = n as f64;
        self.avg_volume = self.trades.iter().map(|t| t.quantity as f64).sum::<f64>() / count;
        self.avg_price = self.trades.iter().map(|t| t.price).sum::<f64>() / count;
        let variance = self
            .trades
            .iter()
            .map(|t| {
                let diff = t.price - self.avg_price;
                diff * diff
            })
            .sum::<f64>()
            / count;
        self.price_volatility = variance.sqrt();
    }
}

struct AccountWindow {
    trades: Vec<Trade>,
    total_volume: f64,
}

impl AccountWindow {
    fn new() -> Self {
        Self {
            trades: Vec::new(),
            total_volume: 0.0,
        }
    }

    fn apply(&mut self, trade: &Trade, lookback: Duration) -> usize {
        let pos = self
            .trades
            .partition_point(|t| t.timestamp <= trade.timestamp);
        self.trades.insert(pos, trade.clone());

        let cutoff = trade.timestamp.saturating_sub(lookback);
        let expired = self.trades.partition_point(|t| t.timestamp < cutoff);
        self.trades.drain(..expired);

        self.total_volume = self.trades.iter().map(|t| t.quantity as f64).sum();
        expired
    }
}

struct KeyEntry {
    touched: AtomicU64,
    window: Mutex<KeyWindow>,
}

struct AccountEntry {
    touched: AtomicU64,
    window: Mutex<AccountWindow>,
}

/// Concurrent store of per-key historical context
pub struct ContextStore {
    keys: DashMap<ContextKey, Arc<KeyEntry>>,
    accounts: DashMap<String, Arc<AccountEntry>>,
    default_lookback: Duration,
    max_retained: usize,
    retained: AtomicUsize,
    touch_seq: AtomicU64,
}

impl ContextStore {
    /// Create a store with the default retention horizon and a cap on the
    /// total number of retained trades across all windows.
    pub fn new(default_lookback: Duration, max_retained: usize) -> Self {
        Self {
            keys: DashMap::new(),
            accounts: DashMap::new(),
            default_lookback,
            max_retained,
            retained: AtomicUsize::new(0),
            touch_seq: AtomicU64::new(0),
        }
    }

    /// Fold `trade` into the key's window and the account's window, then
    /// return a snapshot that includes the trade.
    ///
    /// Updates for the same key are serialized on the per-entry lock; the
    /// lock order is always key window before account window.
    pub fn update(&self, key: &ContextKey, trade: &Trade) -> HistoricalContext {
        let entry = self.key_entry(key);
        let account_entry = self.account_entry(&trade.account_id);
        let seq = self.touch_seq.fetch_add(1, Ordering::Relaxed);
        entry.touched.store(seq, Ordering::Relaxed);
        account_entry.touched.store(seq, Ordering::Relaxed);

        let (mut snapshot, lookback) = {
            let mut window = entry.window.lock();
            let expired = window.apply(trade);
            self.adjust_retained(1, expired);
            let snapshot = HistoricalContext {
                lookback_window: window.lookback,
                recent_trades: window.trades.clone(),
                avg_volume: window.avg_volume,
                avg_price: window.avg_price,
                price_volatility: window.price_volatility,
                quote: window.quote.clone(),
                account_recent_trades: Vec::new(),
                account_total_volume: 0.0,
                related_accounts: Vec::new(),
                related_instruments: Vec::new(),
            };
            (snapshot, window.lookback)
        };
        {
            let mut window = account_entry.window.lock();
            let expired = window.apply(trade, lookback);
            self.adjust_retained(1, expired);
            snapshot.account_recent_trades = window.trades.clone();
            snapshot.account_total_volume = window.total_volume;
            for t in &window.trades {
                if t.instrument_symbol != key.instrument
                    && !snapshot
                        .related_instruments
                        .iter()
                        .any(|s| s == &t.instrument_symbol)
                {
                    snapshot.related_instruments.push(t.instrument_symbol.clone());
                }
            }
        }

        if self.retained.load(Ordering::Relaxed) > self.max_retained {
            self.evict_excess();
        }

        snapshot
    }

    /// Override the retention horizon for one key
    pub fn configure(&self, key: &ContextKey, lookback_window: Duration) {
        let entry = self.key_entry(key);
        entry.window.lock().lookback = lookback_window;
    }

    /// Install the latest quote snapshot for a key
    pub fn update_quote(&self, key: &ContextKey, quote: QuoteSnapshot) {
        let entry = self.key_entry(key);
        entry.window.lock().quote = Some(quote);
    }

    /// Total trades currently retained across all windows
    pub fn retained(&self) -> usize {
        self.retained.load(Ordering::Relaxed)
    }

    /// Number of live context keys
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    fn key_entry(&self, key: &ContextKey) -> Arc<KeyEntry> {
        Arc::clone(
            self.keys
                .entry(key.clone())
                .or_insert_with(|| {
                    Arc::new(KeyEntry {
                        touched: AtomicU64::new(0),
                        window: Mutex::new(KeyWindow::new(self.default_lookback)),
                    })
                })
                .value(),
        )
    }

    fn account_entry(&self, account: &str) -> Arc<AccountEntry> {
        Arc::clone(
            self.accounts
                .entry(account.to_owned())
                .or_insert_with(|| {
                    Arc::new(AccountEntry {
                        touched: AtomicU64::new(0),
                        window: Mutex::new(AccountWindow::new()),
                    })
                })
                .value(),
        )
    }

    fn adjust_retained(&self, added: usize, removed: usize) {
        if added > removed {
            self.retained.fetch_add(added - removed, Ordering::Relaxed);
        } else if removed > added {
            self.retained.fetch_sub(removed - added, Ordering::Relaxed);
        }
    }

    /// Drop least-recently-updated windows until back under the cap.
    /// Key windows go first; account windows only if keys run out.
    fn evict_excess(&self) {
        while self.retained.load(Ordering::Relaxed) > self.max_retained {
            let victim = self
                .keys
                .iter()
                .min_by_key(|e| e.value().touched.load(Ordering::Relaxed))
                .map(|e| e.key().clone());
            if let Some(key) = victim {
                if let Some((_, entry)) = self.keys.remove(&key) {
                    let dropped = entry.window.lock().trades.len();
                    self.retained.fetch_sub(dropped, Ordering::Relaxed);
                    debug!(key = %key, dropped, "evicted context window");
                }
                continue;
            }

            let victim = self
                .accounts
                .iter()
                .min_by_key(|e| e.value().touched.load(Ordering::Relaxed))
                .map(|e| e.key().clone());
            match victim {
                Some(account) => {
                    if let Some((_, entry)) = self.accounts.remove(&account) {
                        let dropped = entry.window.lock().trades.len();
                        self.retained.fetch_sub(dropped, Ordering::Relaxed);
                        debug!(account = %account, dropped, "evicted account window");
                    }
                }
                None => break,
            }
        }
    }
}
